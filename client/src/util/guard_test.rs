use super::*;
use crate::net::types::Identity;
use crate::test_helpers::{FRESH_TOKEN, MockReply, MockTransport, harness, token_server};
use serde_json::json;

fn authenticated(role: Role) -> SessionSnapshot {
    SessionSnapshot {
        status: SessionStatus::Authenticated,
        session: Some(Identity { display_name: "Ada".into(), role, email: None }),
    }
}

fn unauthenticated() -> SessionSnapshot {
    SessionSnapshot { status: SessionStatus::Unauthenticated, session: None }
}

// =============================================================
// evaluate
// =============================================================

#[test]
fn evaluate_loading_is_pending() {
    let loading = SessionSnapshot { status: SessionStatus::Loading, session: None };
    assert_eq!(evaluate(Role::Mentor, &loading), GuardState::PendingCheck);
}

#[test]
fn evaluate_matching_role_is_allowed() {
    assert_eq!(evaluate(Role::Mentor, &authenticated(Role::Mentor)), GuardState::Allowed);
}

#[test]
fn evaluate_wrong_role_redirects_to_own_realm() {
    assert_eq!(
        evaluate(Role::Mentor, &authenticated(Role::Mentee)),
        GuardState::Redirecting { to: "/mentee".into() }
    );
}

#[test]
fn evaluate_unauthenticated_redirects_to_login() {
    assert_eq!(evaluate(Role::Mentee, &unauthenticated()), GuardState::Redirecting { to: LOGIN_PATH.into() });
}

#[test]
fn evaluate_authenticated_without_identity_is_untrusted() {
    let snapshot = SessionSnapshot { status: SessionStatus::Authenticated, session: None };
    assert_eq!(evaluate(Role::Mentor, &snapshot), GuardState::Redirecting { to: LOGIN_PATH.into() });
}

// =============================================================
// tickets
// =============================================================

fn offline_guard(role: Role) -> (RouteGuard, std::sync::Arc<crate::test_helpers::RecordingShell>) {
    let h = harness(token_server(200));
    let session = SessionMachine::new(h.api.clone());
    let guard = RouteGuard::new(role, session, h.shell.clone());
    (guard, h.shell)
}

#[test]
fn pending_check_renders_nothing() {
    let (guard, _) = offline_guard(Role::Mentor);
    guard.begin("/mentor/tasks");
    assert_eq!(guard.state(), GuardState::PendingCheck);
    assert_eq!(guard.render(|| "children"), None);
}

#[test]
fn stale_resolution_neither_renders_nor_redirects() {
    let (guard, shell) = offline_guard(Role::Mentor);
    let first = guard.begin("/mentor/tasks");
    let second = guard.begin("/mentor/reports");

    assert_eq!(guard.resolve(first, &unauthenticated()), GuardOutcome::Superseded);
    assert_eq!(guard.state(), GuardState::PendingCheck);
    assert!(shell.redirects().is_empty());

    assert_eq!(guard.resolve(second, &authenticated(Role::Mentor)), GuardOutcome::Allowed);
    assert_eq!(guard.render(|| 7), Some(7));
    assert_eq!(guard.target().as_deref(), Some("/mentor/reports"));
}

#[test]
fn late_allow_for_abandoned_route_does_not_render() {
    let (guard, _) = offline_guard(Role::Mentor);
    let first = guard.begin("/mentor/a");
    let second = guard.begin("/mentor/b");

    assert_eq!(guard.resolve(second, &unauthenticated()), GuardOutcome::Redirected(LOGIN_PATH.into()));
    assert_eq!(guard.resolve(first, &authenticated(Role::Mentor)), GuardOutcome::Superseded);
    assert_eq!(guard.render(|| ()), None);
}

#[test]
fn unauthenticated_after_allowed_stops_rendering() {
    let (guard, _) = offline_guard(Role::Mentee);
    let ticket = guard.begin("/mentee");
    guard.resolve(ticket, &authenticated(Role::Mentee));
    assert!(guard.render(|| ()).is_some());

    let ticket = guard.begin("/mentee/feedback");
    assert_eq!(guard.render(|| ()), None);
    guard.resolve(ticket, &unauthenticated());
    assert_eq!(guard.render(|| ()), None);
}

// =============================================================
// navigate (end to end through the session machine)
// =============================================================

#[tokio::test]
async fn navigate_allows_matching_role() {
    let h = harness(token_server(200));
    h.api
        .auth()
        .login(
            &crate::net::types::Credential { access_token: FRESH_TOKEN.into(), refresh_token: None },
            &crate::test_helpers::mentor(),
        )
        .unwrap();
    let guard = RouteGuard::new(Role::Mentor, SessionMachine::new(h.api.clone()), h.shell.clone());

    assert_eq!(guard.navigate("/mentor/tasks").await, GuardOutcome::Allowed);
    assert_eq!(guard.render(|| "tasks"), Some("tasks"));
    assert!(h.shell.redirects().is_empty());
}

#[tokio::test]
async fn navigate_redirects_mentee_away_from_mentor_route() {
    let h = harness(MockTransport::new(|_, _| MockReply::Json(200, json!({ "nickname": "Bo", "role": "MENTEE" }))));
    let guard = RouteGuard::new(Role::Mentor, SessionMachine::new(h.api.clone()), h.shell.clone());

    assert_eq!(guard.navigate("/mentor/tasks").await, GuardOutcome::Redirected("/mentee".into()));
    assert_eq!(guard.render(|| ()), None);
    assert_eq!(h.shell.redirects(), ["/mentee"]);
}

#[tokio::test]
async fn navigate_redirects_unauthenticated_to_login() {
    let h = harness(MockTransport::new(|_, _| MockReply::Json(401, json!({}))));
    let guard = RouteGuard::new(Role::Mentee, SessionMachine::new(h.api.clone()), h.shell.clone());

    assert_eq!(guard.navigate("/mentee").await, GuardOutcome::Redirected(LOGIN_PATH.into()));
    assert_eq!(guard.state(), GuardState::Redirecting { to: LOGIN_PATH.into() });
    assert_eq!(guard.render(|| ()), None);
}

#[tokio::test]
async fn newer_navigation_wins_over_slower_check() {
    let h = harness(MockTransport::new(|_, _| MockReply::Json(200, json!({ "nickname": "Bo", "role": "MENTEE" }))));
    let guard = RouteGuard::new(Role::Mentee, SessionMachine::new(h.api.clone()), h.shell.clone());

    let (first, second) = tokio::join!(guard.navigate("/mentee/a"), guard.navigate("/mentee/b"));

    assert_eq!(first, GuardOutcome::Superseded);
    assert_eq!(second, GuardOutcome::Allowed);
    assert_eq!(guard.target().as_deref(), Some("/mentee/b"));
}
