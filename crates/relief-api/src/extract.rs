//! Request extractors: the operator reference, JSON bodies and query
//! strings with uniform error responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use relief_types::Actor;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Header carrying the operator reference.
pub const OPERATOR_HEADER: &str = "x-operator-id";

/// The operator performing a mutation, read from `x-operator-id`.
///
/// The header is trusted as given; authentication happens upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(pub Actor);

impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let reference = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::MissingOperator)?;
        Ok(Self(Actor::new(reference)))
    }
}

/// JSON body whose decoding failures become [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(&rejection)),
        }
    }
}

fn rejection_to_error(rejection: &JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

/// Query string whose decoding failures become [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| ApiError::BadRequest(rejection.body_text()))
    }
}
