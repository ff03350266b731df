//! Request extractors that reject with [`AppError`].
//!
//! Axum's own extractors answer with plain-text rejections. These wrappers
//! turn them into the JSON error body every other failure uses.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
};
use serde::de::DeserializeOwned;

use grouphome_core::case::keys_to_camel;

use crate::error::AppError;

/// `Path` with a JSON 400 on malformed segments.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// `Query` with a JSON 400 on malformed parameters.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// JSON body that accepts either `camelCase` or `snake_case` keys.
///
/// Keys are normalized to `camelCase` before deserializing, so a form
/// posting database column names binds the same as one using API names.
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state).await?;
        serde_json::from_value(keys_to_camel(value))
            .map(Self)
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Form {
        move_out_date: Option<String>,
        group_home_id: i32,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_snake_case_body_binds() {
        let LenientJson(form) = LenientJson::<Form>::from_request(
            request(r#"{"move_out_date":"2025-01-01","group_home_id":3}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(form.move_out_date.as_deref(), Some("2025-01-01"));
        assert_eq!(form.group_home_id, 3);
    }

    #[tokio::test]
    async fn test_camel_case_body_binds() {
        let LenientJson(form) =
            LenientJson::<Form>::from_request(request(r#"{"groupHomeId":1}"#), &())
                .await
                .unwrap();
        assert_eq!(form.group_home_id, 1);
        assert!(form.move_out_date.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_bad_request() {
        let result =
            LenientJson::<Form>::from_request(request(r#"{"groupHomeId":"x"}"#), &()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
