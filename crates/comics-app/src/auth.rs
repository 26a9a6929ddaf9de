//! Bearer token check and per route permissions.
//!
//! [`TokenLayer`] resolves the `Authorization: Bearer <token>` header through
//! an [`Authorizer`] and stores the resulting [`Grant`] in request extensions.
//! [`RequiredPermissionLayer`] then admits only grants holding a permission.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use http::header;
use tower::{Layer, Service};
use tracing::debug;

use crate::error::ApiError;

pub const COMICS_READ: &str = "comics:read";
pub const COMICS_WRITE: &str = "comics:write";

/// Permissions given to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grant {
    permissions: BTreeSet<String>,
}

impl Grant {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Grant {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

pub trait Authorizer: Send + Sync {
    /// Grant for a bearer token, `None` rejects the request.
    fn grant(&self, token: Option<&str>) -> Option<Grant>;
}

/// Admits every request with all permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn grant(&self, _token: Option<&str>) -> Option<Grant> {
        Some(Grant::new([COMICS_READ, COMICS_WRITE]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token entry '{0}', expected TOKEN=permission[,permission...]")]
pub struct InvalidTokenEntry(pub String);

/// Fixed set of tokens, each with its own permissions.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Grant>,
}

impl StaticTokens {
    /// Parses entries like `s3cr3t=comics:read,comics:write`.
    pub fn parse<I, S>(entries: I) -> Result<Self, InvalidTokenEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = HashMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (token, permissions) = entry
                .split_once('=')
                .ok_or_else(|| InvalidTokenEntry(entry.to_string()))?;
            let token = token.trim();
            let permissions = permissions
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>();
            if token.is_empty() || permissions.is_empty() {
                return Err(InvalidTokenEntry(entry.to_string()));
            }
            tokens.insert(token.to_string(), Grant::new(permissions));
        }
        Ok(StaticTokens { tokens })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authorizer for StaticTokens {
    fn grant(&self, token: Option<&str>) -> Option<Grant> {
        token.and_then(|t| self.tokens.get(t).cloned())
    }
}

/// Token from the Authorization header.
///
/// `Err` when the header is there but is not a bearer token.
fn bearer_token(request: &Request) -> Result<Option<&str>, ()> {
    match request.headers().get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| Some(t.trim()))
            .ok_or(()),
    }
}

#[derive(Clone)]
pub struct TokenLayer {
    authorizer: Arc<dyn Authorizer>,
}

impl TokenLayer {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

impl<S> Layer<S> for TokenLayer {
    type Service = TokenMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenMiddleware {
            inner,
            authorizer: self.authorizer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TokenMiddleware<S> {
    inner: S,
    authorizer: Arc<dyn Authorizer>,
}

impl<S> Service<Request> for TokenMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let grant = match bearer_token(&request) {
            Ok(token) => self.authorizer.grant(token),
            Err(()) => {
                debug!("Malformed Authorization header");
                None
            }
        };

        let Some(grant) = grant else {
            return Box::pin(async { Ok(ApiError::InvalidToken.into_response()) });
        };
        request.extensions_mut().insert(grant);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(inner.call(request))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequiredPermissionLayer {
    permission: &'static str,
}

impl RequiredPermissionLayer {
    pub fn new(permission: &'static str) -> Self {
        Self { permission }
    }
}

impl<S> Layer<S> for RequiredPermissionLayer {
    type Service = RequiredPermissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequiredPermissionMiddleware {
            inner,
            permission: self.permission,
        }
    }
}

#[derive(Clone)]
pub struct RequiredPermissionMiddleware<S> {
    inner: S,
    permission: &'static str,
}

impl<S> Service<Request> for RequiredPermissionMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let rejection = match request.extensions().get::<Grant>() {
            Some(grant) if grant.has_permission(self.permission) => None,
            Some(_) => {
                debug!("Missing permission {}", self.permission);
                Some(ApiError::NotPermitted)
            }
            None => Some(ApiError::InvalidToken),
        };
        if let Some(rejection) = rejection {
            return Box::pin(async move { Ok(rejection.into_response()) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(inner.call(request))
    }
}
