use crate::errors::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` whose rejection is an [`ApiError`] body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Query` whose rejection is an [`ApiError`] body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
