use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::store::PageMeta;

/// Successful response envelope: `{"data": ..., "success": true[, "meta": ...]}`.
pub struct Envelope<T> {
    data: T,
    meta: Option<PageMeta>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    pub fn with_meta(data: T, meta: PageMeta) -> Self {
        Self {
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> axum::response::Response {
        let body = match self.meta {
            Some(meta) => json!({ "data": self.data, "success": true, "meta": meta }),
            None => json!({ "data": self.data, "success": true }),
        };
        Json(body).into_response()
    }
}
