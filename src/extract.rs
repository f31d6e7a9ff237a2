//! Request extractors that reject with [`AppError`].

use axum::{
    Form,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Form extractor whose rejection is a `Validation` error.
///
/// Missing or unparseable fields answer 400 with the usual JSON error body
/// instead of axum's plain-text 422.
///
/// ```rust,ignore
/// async fn pick(AppForm(request): AppForm<PickRequest>) -> Result<Response, AppError> {
///     // request.picked is present here
/// }
/// ```
pub struct AppForm<T>(pub T);

impl<S, T> FromRequest<S> for AppForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(AppForm(value))
    }
}
