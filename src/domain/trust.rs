//! Trust tiers and the conditions a handler may require

use async_trait::async_trait;

use crate::domain::session::{SessionContext, UserRef};

/// Conditions a request handler declares before receiving an identity
///
/// Each flag adds one independent check; all requested checks must pass.
/// Omitted flags are not evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustConditions {
    /// Require a non-null API credential
    pub is_api_token: bool,
    /// Require a logged-in user reachable over a safe origin or credential
    pub is_user: bool,
    /// Require a genuine cookie session from a safe origin, no credential
    pub is_official_user: bool,
}

impl TrustConditions {
    pub fn api_token() -> Self {
        Self {
            is_api_token: true,
            ..Default::default()
        }
    }

    pub fn user() -> Self {
        Self {
            is_user: true,
            ..Default::default()
        }
    }

    pub fn official_user() -> Self {
        Self {
            is_official_user: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.is_api_token && !self.is_user && !self.is_official_user
    }
}

/// Authentication guarantee a request satisfies
///
/// Ordered lattice: `Anonymous < ApiCredentialed < SessionUser <
/// OfficialSessionUser`. Used for log fields and metrics, never as a
/// substitute for evaluating the individual trust conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthTier {
    Anonymous,
    ApiCredentialed,
    SessionUser,
    OfficialSessionUser,
}

impl AuthTier {
    /// Derive the strongest tier a session can claim.
    pub fn of(session: &SessionContext) -> Self {
        if session.is_logged_in && session.from_safe_origin && session.api_token.is_none() {
            AuthTier::OfficialSessionUser
        } else if session.is_logged_in
            && (session.from_safe_origin || session.api_token.is_some())
        {
            AuthTier::SessionUser
        } else if session.api_token.is_some() {
            AuthTier::ApiCredentialed
        } else {
            AuthTier::Anonymous
        }
    }

    /// Tier name for logging and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthTier::Anonymous => "anonymous",
            AuthTier::ApiCredentialed => "api_credentialed",
            AuthTier::SessionUser => "session_user",
            AuthTier::OfficialSessionUser => "official_session_user",
        }
    }
}

impl std::fmt::Display for AuthTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External collaborator that resolves a user record from session state
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Resolve the user attached to the session, if any.
    async fn get_user(&self, session: &SessionContext) -> Option<UserRef>;
}
