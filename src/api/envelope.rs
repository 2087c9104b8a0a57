//! Response envelope shared by every `/api/v1` endpoint.
//!
//! Success bodies are `{ "data": T, "meta": { ... } }`; failures are
//! `{ "error": { "code", "message" }, "meta": { ... } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::error::EngineError;

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: "1",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Response {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: msg.into(),
            },
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
    }

    /// Unknown domain/entity/metric/rule → 404; anything else the engine
    /// refuses is a bad request.
    pub fn from_engine(err: &EngineError) -> Response {
        match err {
            EngineError::NotFound { .. } => Self::not_found(err.to_string()),
            EngineError::InvalidConfiguration(_) => {
                Self::build(StatusCode::BAD_REQUEST, "INVALID_CONFIGURATION", err.to_string())
            }
            EngineError::InvalidValue { .. } => {
                Self::build(StatusCode::BAD_REQUEST, "INVALID_VALUE", err.to_string())
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        ApiErrorResponse::from_engine(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"generation": 3}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json(resp).await;
        assert_eq!(v["data"]["generation"], 3);
        assert_eq!(v["meta"]["version"], "1");
    }

    #[tokio::test]
    async fn test_engine_errors_map_to_status_codes() {
        let resp = ApiErrorResponse::from_engine(&EngineError::not_found(ResourceKind::Entity, 42));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v = json(resp).await;
        assert_eq!(v["error"]["code"], "NOT_FOUND");
        assert_eq!(v["error"]["message"], "entity not found: 42");

        let resp = EngineError::InvalidValue {
            field: "choke".into(),
            value: f64::INFINITY,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"]["code"], "INVALID_VALUE");
    }
}
