//! Per-request and per-socket session facts
//!
//! These types are produced by the session layer before admission control
//! runs and stay immutable for the lifetime of one request or socket.

use std::net::IpAddr;

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a resolved, authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
}

impl UserRef {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Session state resolved for one request or socket
///
/// `users` may carry more than one identity for co-signed shared sessions;
/// the first entry is the primary identity.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Whether the session cookie resolved to a live login
    pub is_logged_in: bool,
    /// API credential presented by a programmatic client, if any
    pub api_token: Option<String>,
    /// Whether the request's declared origin passed the safety classifier
    pub from_safe_origin: bool,
    /// Authenticated identities attached to the session
    pub users: Vec<UserRef>,
}

impl SessionContext {
    pub fn primary_user(&self) -> Option<&UserRef> {
        self.users.first()
    }

    pub fn has_api_token(&self) -> bool {
        self.api_token.is_some()
    }
}

/// The request shape admission control consumes
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session: SessionContext,
    /// Resolved client address
    pub ip: IpAddr,
    /// Declared GraphQL operation name, when the request is a GraphQL call
    pub operation: Option<String>,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestContext {
    /// Selector for the per-credential bucket: the declared operation name
    /// for GraphQL, method plus path for REST.
    pub fn api_selector(&self) -> String {
        match &self.operation {
            Some(operation) => operation.clone(),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

/// The socket shape admission control consumes
#[derive(Debug, Clone)]
pub struct SocketContext {
    pub session: SessionContext,
    /// Resolved client address of the underlying connection
    pub ip: IpAddr,
    /// Transport-assigned connection identifier
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_selector_prefers_operation_name() {
        let request = RequestContext {
            session: SessionContext::default(),
            ip: "10.0.0.1".parse().unwrap(),
            operation: Some("listPosts".to_string()),
            method: Method::POST,
            path: "/graphql".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(request.api_selector(), "listPosts");
    }

    #[test]
    fn api_selector_falls_back_to_method_and_path() {
        let request = RequestContext {
            session: SessionContext::default(),
            ip: "10.0.0.1".parse().unwrap(),
            operation: None,
            method: Method::GET,
            path: "/api/posts".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(request.api_selector(), "GET /api/posts");
    }

    #[test]
    fn primary_user_is_first_attached() {
        let first = UserRef::new(Uuid::new_v4());
        let second = UserRef::new(Uuid::new_v4());
        let session = SessionContext {
            is_logged_in: true,
            api_token: None,
            from_safe_origin: true,
            users: vec![first, second],
        };
        assert_eq!(session.primary_user(), Some(&first));
    }
}
