//! Request identity carried in headers.
//!
//! `x-session-id` names the visitor's cart and is required on every
//! storefront call. `x-account-id` is set once the visitor has signed in.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use common::{AccountId, SessionId};
use settlement::SettlementError;

use crate::error::ApiError;

pub const SESSION_HEADER: &str = "x-session-id";
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// The caller's session and, when signed in, account.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub account_id: Option<AccountId>,
}

impl Session {
    /// Returns the account, or asks the caller to sign in and come back to `return_to`.
    pub fn require_account(&self, return_to: &str) -> Result<AccountId, ApiError> {
        self.account_id.ok_or_else(|| {
            SettlementError::AuthenticationRequired {
                return_to: return_to.to_string(),
            }
            .into()
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session_id = header(parts, SESSION_HEADER)?
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {SESSION_HEADER} header")))?;
        let account_id = header(parts, ACCOUNT_HEADER)?
            .map(|raw| {
                raw.parse::<AccountId>()
                    .map_err(|e| ApiError::BadRequest(format!("Invalid {ACCOUNT_HEADER}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            session_id: SessionId::new(session_id),
            account_id,
        })
    }
}

/// Browsing endpoints accept callers without a session.
impl<S: Send + Sync> OptionalFromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if header(parts, SESSION_HEADER)?.is_none() {
            return Ok(None);
        }
        <Session as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name} header")))?
        .trim();
    Ok((!value.is_empty()).then_some(value))
}

/// Parses an identifier taken from the URL path.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
