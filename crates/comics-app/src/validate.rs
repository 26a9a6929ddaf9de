use std::ops::{Deref, DerefMut};

use axum::extract::{FromRequest, Request};
use garde::Validate;

use crate::{error::ApiError, state::AppState};

/// Extractor that runs validation rules on the extracted payload.
///
/// Rules are checked against a fresh default context, so clock dependent
/// rules see the current date.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<E>(pub E);

impl<E> Deref for Valid<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> DerefMut for Valid<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<E> Valid<E> {
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<Extractor, T> FromRequest<AppState> for Valid<Extractor>
where
    T: Validate,
    T::Context: Default,
    Extractor: Deref<Target = T> + FromRequest<AppState>,
    ApiError: From<<Extractor as FromRequest<AppState>>::Rejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state).await?;
        comics_dal::validation::validate(inner.deref())?;
        Ok(Valid(inner))
    }
}
