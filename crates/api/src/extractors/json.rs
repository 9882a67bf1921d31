//! JSON body extractor with the shared error body.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Like [`Json`], but rejections are reported as [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("Expected a JSON request body".to_string())
        }
        other => ApiError::BadRequest(other.body_text()),
    }
}

/// Parse a raw webhook body. Devices do not always send a JSON content type.
pub fn parse_payload(body: &[u8]) -> Result<serde_json::Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body1 {
        user_code: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = HttpRequest::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_api_json_accepts_valid_body() {
        let ApiJson(body) = ApiJson::<Body1>::from_request(
            request(Some("application/json"), r#"{"user_code":"DEMO01"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(body.user_code, "DEMO01");
    }

    #[tokio::test]
    async fn test_api_json_rejects_missing_field_as_bad_request() {
        let err = ApiJson::<Body1>::from_request(request(Some("application/json"), "{}"), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_json_rejects_missing_content_type() {
        let err = ApiJson::<Body1>::from_request(request(None, r#"{"user_code":"DEMO01"}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("JSON")));
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(br#"{"deviceId":"a"}"#).unwrap()["deviceId"], "a");
        assert!(matches!(parse_payload(b"not json"), Err(ApiError::BadRequest(_))));
    }
}
