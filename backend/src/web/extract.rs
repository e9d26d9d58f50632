use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::web::error::{AppError, FieldErrors};

/// A raw request payload that checks itself and converts into a domain value.
pub trait IntoValidated {
    type Output;

    fn into_validated(self) -> Result<Self::Output, FieldErrors>;
}

/// JSON body that has passed validation. Yields `T::Output`.
pub struct ValidatedJson<T: IntoValidated>(pub T::Output);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: IntoValidated + DeserializeOwned + Send,
    T::Output: Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await?;
        let value = payload.into_validated().map_err(AppError::Validation)?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that has passed validation. Yields `T::Output`.
pub struct ValidatedQuery<T: IntoValidated>(pub T::Output);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: IntoValidated + DeserializeOwned + Send,
    T::Output: Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state).await?;
        let value = params.into_validated().map_err(AppError::Validation)?;
        Ok(ValidatedQuery(value))
    }
}

/// The `{id}` path segment as a 32-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub i32);

impl ItemId {
    fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<i32>().ok().map(ItemId)
    }
}

impl<S> FromRequestParts<S> for ItemId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::invalid_id())?;
        ItemId::parse(&raw).ok_or_else(AppError::invalid_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_must_be_whole_numbers() {
        assert_eq!(ItemId::parse("42"), Some(ItemId(42)));
        assert_eq!(ItemId::parse(" 7 "), Some(ItemId(7)));
        assert_eq!(ItemId::parse("-3"), Some(ItemId(-3)));
        assert_eq!(ItemId::parse("12abc"), None);
        assert_eq!(ItemId::parse("abc"), None);
        assert_eq!(ItemId::parse("99999999999"), None);
    }
}
