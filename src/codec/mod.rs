//! Request and response body encoding.
//!
//! Bodies are plain JSON or MongoDB Extended JSON (`application/ejson`). Both
//! decode into BSON before the operation request is deserialized, so filters,
//! updates and pipelines reach the store as native documents.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
};
use bson::{Bson, Document};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const EJSON_CONTENT_TYPE: &str = "application/ejson";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed request body: {0}")]
    Syntax(String),

    #[error("Malformed extended JSON: {0}")]
    ExtendedJson(String),

    #[error("Invalid request: {0}")]
    Shape(String),

    #[error("Request body exceeds the configured size limit")]
    TooLarge,

    #[error("Failed to read request body: {0}")]
    Transport(String),
}

/// Wire format of a request or response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    #[default]
    Json,
    ExtendedJson,
}

impl BodyFormat {
    /// Format declared by `Content-Type`. A missing header means JSON.
    pub fn from_content_type(headers: &HeaderMap) -> Result<Self, CodecError> {
        let Some(value) = headers.get(header::CONTENT_TYPE) else {
            return Ok(BodyFormat::Json);
        };
        let raw = value
            .to_str()
            .map_err(|_| CodecError::UnsupportedContentType("<non-ascii>".to_string()))?;
        let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            JSON_CONTENT_TYPE => Ok(BodyFormat::Json),
            EJSON_CONTENT_TYPE => Ok(BodyFormat::ExtendedJson),
            _ => Err(CodecError::UnsupportedContentType(raw.to_string())),
        }
    }

    /// Format requested through `Accept`; anything but ejson gets JSON.
    pub fn from_accept(headers: &HeaderMap) -> Self {
        let wants_ejson = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|v| v.split(';').next().unwrap_or_default().trim().eq_ignore_ascii_case(EJSON_CONTENT_TYPE));
        if wants_ejson {
            BodyFormat::ExtendedJson
        } else {
            BodyFormat::Json
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BodyFormat::Json => JSON_CONTENT_TYPE,
            BodyFormat::ExtendedJson => EJSON_CONTENT_TYPE,
        }
    }
}

/// Parses a fully buffered body and deserializes it into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8], format: BodyFormat) -> Result<T, CodecError> {
    let json: Value = serde_json::from_slice(body).map_err(|e| CodecError::Syntax(e.to_string()))?;
    let bson = match format {
        BodyFormat::Json => plain_json_to_bson(json),
        BodyFormat::ExtendedJson => {
            Bson::try_from(json).map_err(|e| CodecError::ExtendedJson(e.to_string()))?
        }
    };
    if !matches!(bson, Bson::Document(_)) {
        return Err(CodecError::Shape("request body must be an object".to_string()));
    }
    bson::from_bson(bson).map_err(|e| CodecError::Shape(e.to_string()))
}

/// Renders a response value. JSON callers get relaxed Extended JSON, which is
/// plain JSON wherever the value allows it.
pub fn encode<T: Serialize>(data: &T, format: BodyFormat) -> Result<Value, bson::ser::Error> {
    let bson = bson::to_bson(data)?;
    Ok(match format {
        BodyFormat::Json => bson.into_relaxed_extjson(),
        BodyFormat::ExtendedJson => bson.into_canonical_extjson(),
    })
}

/// JSON without Extended JSON interpretation: `$`-prefixed keys stay keys.
fn plain_json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map(Bson::Int32).unwrap_or(Bson::Int64(i))
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(plain_json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(k, v)| (k, plain_json_to_bson(v)))
                .collect::<Document>(),
        ),
    }
}

/// Body extractor for JSON and Extended JSON requests
#[derive(Debug, Clone)]
pub struct ExtendedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ExtendedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let format = BodyFormat::from_content_type(req.headers())?;
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                CodecError::TooLarge
            } else {
                CodecError::Transport(rejection.body_text())
            }
        })?;
        Ok(ExtendedJson(decode(&bytes, format)?))
    }
}

/// Response format negotiated from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseFormat(pub BodyFormat);

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseFormat(BodyFormat::from_accept(&parts.headers)))
    }
}
