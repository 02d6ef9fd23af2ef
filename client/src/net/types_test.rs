use super::*;
use serde_json::json;

// =============================================================
// Role
// =============================================================

#[test]
fn role_serializes_uppercase() {
    assert_eq!(serde_json::to_value(Role::Mentor).unwrap(), json!("MENTOR"));
    assert_eq!(serde_json::from_value::<Role>(json!("MENTEE")).unwrap(), Role::Mentee);
}

#[test]
fn role_parse_is_lenient_about_case() {
    assert_eq!(Role::parse(" mentor "), Some(Role::Mentor));
    assert_eq!(Role::parse("Mentee"), Some(Role::Mentee));
    assert_eq!(Role::parse("ADMIN"), None);
}

#[test]
fn role_home_paths_differ_per_realm() {
    assert_eq!(Role::Mentor.home_path(), "/mentor");
    assert_eq!(Role::Mentee.home_path(), "/mentee");
    assert_ne!(Role::Mentor.home_path(), LOGIN_PATH);
}

// =============================================================
// Credential + login payload
// =============================================================

#[test]
fn credential_debug_redacts_tokens() {
    let credential = Credential { access_token: "secret-a".into(), refresh_token: Some("secret-r".into()) };
    let rendered = format!("{credential:?}");
    assert!(!rendered.contains("secret-a"));
    assert!(!rendered.contains("secret-r"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn login_response_splits_into_credential_and_identity() {
    let body = json!({
        "accessToken": "at",
        "refreshToken": "rt",
        "nickname": "Ada",
        "role": "MENTOR",
        "email": "ada@example.test",
        "isFirstLogin": false
    });
    let parsed: LoginResponse = serde_json::from_value(body).unwrap();
    let (credential, identity) = parsed.into_parts();
    assert_eq!(credential.access_token, "at");
    assert_eq!(credential.refresh_token.as_deref(), Some("rt"));
    assert_eq!(identity.display_name, "Ada");
    assert_eq!(identity.role, Role::Mentor);
    assert_eq!(identity.email.as_deref(), Some("ada@example.test"));
}

#[test]
fn refresh_request_omits_missing_token() {
    let body = serde_json::to_value(RefreshRequest { refresh_token: None }).unwrap();
    assert_eq!(body, json!({}));
    let body = serde_json::to_value(RefreshRequest { refresh_token: Some("rt") }).unwrap();
    assert_eq!(body, json!({ "refreshToken": "rt" }));
}

// =============================================================
// parse_me_payload
// =============================================================

#[test]
fn me_payload_accepts_bare_identity() {
    let payload = parse_me_payload(&json!({ "nickname": "Bo", "role": "MENTEE" }));
    assert_eq!(
        payload,
        MePayload::Identity(Identity { display_name: "Bo".into(), role: Role::Mentee, email: None })
    );
}

#[test]
fn me_payload_accepts_nested_user_and_display_name_alias() {
    let payload = parse_me_payload(&json!({ "user": { "displayName": "Cy", "role": "MENTOR" } }));
    assert!(matches!(payload, MePayload::Identity(identity) if identity.display_name == "Cy"));
}

#[test]
fn me_payload_recognizes_no_session_markers() {
    assert_eq!(parse_me_payload(&json!(null)), MePayload::NoSession);
    assert_eq!(parse_me_payload(&json!({})), MePayload::NoSession);
    assert_eq!(parse_me_payload(&json!({ "authenticated": false })), MePayload::NoSession);
    assert_eq!(parse_me_payload(&json!({ "loggedIn": false, "nickname": "x", "role": "MENTOR" })), MePayload::NoSession);
}

#[test]
fn me_payload_rejects_unknown_role() {
    assert_eq!(parse_me_payload(&json!({ "nickname": "Di", "role": "ADMIN" })), MePayload::Invalid);
    assert_eq!(parse_me_payload(&json!("nope")), MePayload::Invalid);
}
