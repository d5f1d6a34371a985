// libs/appointment-cell/src/extract.rs
//! axum extractors whose rejections become [`AppError`] responses, so
//! malformed input gets the usual `{"success": false, "error": ...}` body.

use axum::extract::{FromRequest, FromRequestParts};

use shared_models::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);
