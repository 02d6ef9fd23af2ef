//! Wire DTOs for the auth endpoints and the identity they describe.
//!
//! DESIGN
//! ======
//! Field names follow the remote API's camelCase JSON. `Credential` carries
//! bearer secrets, so its `Debug` output is redacted.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the login surface every unauthenticated redirect lands on.
pub const LOGIN_PATH: &str = "/login";

// =============================================================================
// ROLE
// =============================================================================

/// Realm a user belongs to. Each realm has its own protected entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mentor => "MENTOR",
            Self::Mentee => "MENTEE",
        }
    }

    /// Parse a persisted or user-supplied role, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MENTOR" => Some(Self::Mentor),
            "MENTEE" => Some(Self::Mentee),
            _ => None,
        }
    }

    /// Entry point of this role's realm.
    #[must_use]
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Mentor => "/mentor",
            Self::Mentee => "/mentee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// IDENTITY + CREDENTIAL
// =============================================================================

/// Server-confirmed identity of the current session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name (`nickname` on the wire).
    #[serde(rename = "nickname", alias = "displayName")]
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Bearer access token plus the optional refresh token that renews it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// ENDPOINT PAYLOADS
// =============================================================================

/// Successful `POST /auth/login/<method>` body.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub nickname: String,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
}

impl LoginResponse {
    #[must_use]
    pub fn into_parts(self) -> (Credential, Identity) {
        let credential = Credential { access_token: self.access_token, refresh_token: self.refresh_token };
        let identity = Identity { display_name: self.nickname, role: self.role, email: self.email };
        (credential, identity)
    }
}

/// `POST /auth/refresh` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

/// Successful `POST /auth/refresh` body. The refresh token is only present
/// when the server rotates it.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Interpreted `GET /auth/me` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MePayload {
    Identity(Identity),
    /// The server explicitly reported that no session exists.
    NoSession,
    /// The body was neither an identity nor a recognizable no-session marker.
    Invalid,
}

/// Interpret a who-am-I body.
///
/// Accepts a bare identity object or one nested under `user`. `null`, an empty
/// body, or an object with `authenticated: false` / `loggedIn: false` is an
/// explicit no-session marker.
#[must_use]
pub fn parse_me_payload(body: &Value) -> MePayload {
    let Some(map) = body.as_object() else {
        return if body.is_null() { MePayload::NoSession } else { MePayload::Invalid };
    };
    let denied = ["authenticated", "loggedIn"]
        .iter()
        .any(|key| map.get(*key).and_then(Value::as_bool) == Some(false));
    if denied {
        return MePayload::NoSession;
    }
    let candidate = map.get("user").filter(|user| user.is_object()).unwrap_or(body);
    match serde_json::from_value::<Identity>(candidate.clone()) {
        Ok(identity) => MePayload::Identity(identity),
        Err(_) if map.is_empty() => MePayload::NoSession,
        Err(_) => MePayload::Invalid,
    }
}
