use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use loo_types::{Contributor, REPORT_PERMISSION};

use crate::config::TokenConfig;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub permissions: BTreeSet<String>,
    pub is_admin: bool,
    /// `false` for requests without credentials.
    pub authenticated: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".into(),
            permissions: BTreeSet::new(),
            is_admin: false,
            authenticated: false,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeSet::new(),
            is_admin: false,
            authenticated: true,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::user(name)
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// The contributor this identity submits as; `None` when anonymous.
    pub fn contributor(&self) -> Option<Contributor> {
        self.authenticated.then(|| Contributor {
            name: self.name.clone(),
            permissions: self.permissions.clone(),
            admin: self.is_admin,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read `Authorization: Bearer <token>`. A missing header is anonymous;
    /// any other scheme is rejected.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::AuthFailed("malformed authorization header".into()))?;
        match value.split_once(' ') {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Ok(Self::Bearer(token.trim().to_string()))
            }
            _ => Err(ServerError::AuthFailed(
                "expected a bearer token".into(),
            )),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Maps configured tokens to identities.
pub struct StaticTokenAuth {
    tokens: HashMap<String, Identity>,
    allow_anonymous: bool,
}

impl StaticTokenAuth {
    pub fn new(tokens: &[TokenConfig], allow_anonymous: bool) -> Self {
        let tokens = tokens
            .iter()
            .map(|t| {
                let identity = Identity {
                    name: t.name.clone(),
                    permissions: t.permissions.iter().cloned().collect(),
                    is_admin: t.admin,
                    authenticated: true,
                };
                (t.token.clone(), identity)
            })
            .collect();
        Self {
            tokens,
            allow_anonymous,
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => self
                .tokens
                .get(token)
                .cloned()
                .ok_or_else(|| ServerError::AuthFailed("unknown token".into())),
            Credentials::Anonymous if self.allow_anonymous => Ok(Identity::anonymous()),
            Credentials::Anonymous => Err(ServerError::AuthFailed(
                "anonymous access is disabled".into(),
            )),
        }
    }
}

/// Accepts any bearer token as a reporter. For local development.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => Ok(Identity::user(format!(
                "bearer:{}",
                token.chars().take(8).collect::<String>()
            ))
            .with_permission(REPORT_PERMISSION)),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }
}
