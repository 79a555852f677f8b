//! `Payload` extractor: a validated request DTO read from the JSON body,
//! or from the query string when the body is empty.
//!
//! Clients of the polling endpoints send `{token}` as a JSON body even on
//! `GET`, so both sources are accepted.

use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use chathub_core::error::AppError;

use crate::error::ApiError;

/// Extracted and validated request payload.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uri = req.uri().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(format!("Failed to read request body: {e}")))?;

        let value: T = if body.iter().all(u8::is_ascii_whitespace) {
            let Query(value) = Query::<T>::try_from_uri(&uri)
                .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
            value
        } else {
            serde_json::from_slice(&body)
                .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?
        };

        value.validate()?;
        Ok(Payload(value))
    }
}
