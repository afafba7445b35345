use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::codec::{self, BodyFormat};
use crate::error::ApiError;

/// Successful response rendered in the negotiated body format
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    pub format: BodyFormat,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
            format: BodyFormat::Json,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            status_code: Some(StatusCode::CREATED),
            ..Self::success(data)
        }
    }

    pub fn with_format(mut self, format: BodyFormat) -> Self {
        self.format = format;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let body = match codec::encode(&self.data, self.format) {
            Ok(value) => value,
            Err(e) => return ApiError::internal(format!("Failed to serialize response data: {}", e)).into_response(),
        };

        let mut response = (status, Json(body)).into_response();
        if self.format == BodyFormat::ExtendedJson {
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(codec::EJSON_CONTENT_TYPE),
            );
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
