//! Request trust resolution
//!
//! Translates resolved session state plus a handler's declared conditions
//! into either an authenticated identity or a named failure. There is no
//! silent downgrade: each requested condition is checked independently and
//! the first failure propagates.

use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::AdmissionError;
use crate::domain::session::{SessionContext, UserRef};
use crate::domain::trust::{AuthTier, SessionService, TrustConditions};

/// Resolves the trust tier a request claims against the tier it can prove
pub struct RequestTrustResolver {
    sessions: Arc<dyn SessionService>,
}

impl RequestTrustResolver {
    pub fn new(sessions: Arc<dyn SessionService>) -> Self {
        Self { sessions }
    }

    /// Check every requested condition against the session.
    ///
    /// Returns the resolved user when a user-bearing condition was
    /// requested and satisfied, `Ok(None)` when no conditions were
    /// requested or only `is_api_token` was.
    pub async fn resolve(
        &self,
        session: &SessionContext,
        conditions: &TrustConditions,
    ) -> Result<Option<UserRef>, AdmissionError> {
        let mut resolved: Option<UserRef> = None;

        if conditions.is_api_token && !session.has_api_token() {
            return Err(AdmissionError::MustUseApiToken);
        }

        if conditions.is_user {
            // An API credential substitutes for a safe origin at this tier.
            let eligible = session.from_safe_origin || session.has_api_token();
            match self.session_user(session, eligible).await {
                Some(user) => resolved = Some(user),
                None => return Err(AdmissionError::NotLoggedIn),
            }
        }

        if conditions.is_official_user {
            // Official status is reserved for genuine cookie sessions; a
            // presented credential disqualifies even a logged-in caller.
            let eligible = session.from_safe_origin && !session.has_api_token();
            match self.session_user(session, eligible).await {
                Some(user) => resolved = Some(user),
                None => return Err(AdmissionError::NotLoggedInOfficial),
            }
        }

        debug!(
            tier = %AuthTier::of(session),
            resolved_user = resolved.is_some(),
            "trust conditions satisfied"
        );

        Ok(resolved)
    }

    async fn session_user(&self, session: &SessionContext, eligible: bool) -> Option<UserRef> {
        if !session.is_logged_in || !eligible {
            return None;
        }
        self.sessions.get_user(session).await
    }
}
