//! POST /action/:operation - the nine generic data actions.
//!
//! Inserts answer 201, everything else 200. Responses follow the `Accept`
//! header: relaxed Extended JSON by default, canonical for `application/ejson`.

use axum::extract::State;

use crate::api::action::{
    AggregateRequest, DeleteRequest, DeleteResponse, DocumentsResponse, FindOneRequest, FindOneResponse,
    FindRequest, InsertManyRequest, InsertManyResponse, InsertOneRequest, InsertOneResponse, UpdateRequest,
    UpdateResponse,
};
use crate::codec::{ExtendedJson, ResponseFormat};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn insert_one(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<InsertOneRequest>,
) -> ApiResult<InsertOneResponse> {
    let response = state.actions().insert_one(request).await?;
    Ok(ApiResponse::created(response).with_format(format))
}

pub async fn insert_many(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<InsertManyRequest>,
) -> ApiResult<InsertManyResponse> {
    let response = state.actions().insert_many(request).await?;
    Ok(ApiResponse::created(response).with_format(format))
}

pub async fn find_one(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<FindOneRequest>,
) -> ApiResult<FindOneResponse> {
    let response = state.actions().find_one(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn find(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<FindRequest>,
) -> ApiResult<DocumentsResponse> {
    let response = state.actions().find(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn update_one(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<UpdateRequest>,
) -> ApiResult<UpdateResponse> {
    let response = state.actions().update_one(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn update(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<UpdateRequest>,
) -> ApiResult<UpdateResponse> {
    let response = state.actions().update_many(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn delete_one(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<DeleteRequest>,
) -> ApiResult<DeleteResponse> {
    let response = state.actions().delete_one(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn delete(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<DeleteRequest>,
) -> ApiResult<DeleteResponse> {
    let response = state.actions().delete_many(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}

pub async fn aggregate(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<AggregateRequest>,
) -> ApiResult<DocumentsResponse> {
    let response = state.actions().aggregate(request).await?;
    Ok(ApiResponse::success(response).with_format(format))
}
