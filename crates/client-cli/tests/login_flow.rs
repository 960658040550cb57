mod common;

use common::{MockApi, ADMIN_EMAIL, CUSTOMER_EMAIL, PASSWORD, TAKEN_EMAIL};
use packdesk::credentials::CredentialStore;
use packdesk::router::{self, Route};
use packdesk::session::SessionContext;
use packdesk::views::{LoginView, RegisterView};
use shared::Role;

fn store(dir: &tempfile::TempDir) -> CredentialStore {
    CredentialStore::new(dir.path().join("remembered.json"), true)
}

#[tokio::test]
async fn test_short_password_never_reaches_the_network() {
    let mock = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = SessionContext::new();

    let mut view = LoginView::mount(store(&dir));
    view.set_email(ADMIN_EMAIL);
    view.set_password("12345");
    view.set_role(Role::Admin);

    assert_eq!(view.submit(&mock.client(), &mut session).await, None);
    assert_eq!(
        view.error.as_deref(),
        Some("Please enter a valid email and a password with 6+ characters.")
    );
    assert_eq!(mock.state.total_hits(), 0);
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_admin_login_with_remember_persists_exact_record() {
    let mock = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let mut session = SessionContext::new();

    let mut view = LoginView::mount(store.clone());
    view.set_email(ADMIN_EMAIL);
    view.set_password(PASSWORD);
    view.set_role(Role::Admin);
    view.set_remember(true);

    let route = view.submit(&mock.client(), &mut session).await;
    assert_eq!(route, Some(Route::Admin));
    assert_eq!(session.role(), Some(Role::Admin));
    assert_eq!(session.token(), Some(common::ADMIN_TOKEN));
    assert_eq!(mock.state.hits("admin_login"), 1);
    assert_eq!(mock.state.hits("customer_login"), 0);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!({"email": ADMIN_EMAIL, "password": PASSWORD, "role": "admin"})
    );
}

#[tokio::test]
async fn test_login_without_remember_deletes_old_record() {
    let mock = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.save("old@example.com", "oldpass", Role::Customer).unwrap();
    let mut session = SessionContext::new();

    let mut view = LoginView::mount(store.clone());
    assert!(view.remember);
    view.set_email(CUSTOMER_EMAIL);
    assert!(!view.remember);
    assert!(store.path().exists());

    view.set_password(PASSWORD);
    let route = view.submit(&mock.client(), &mut session).await;
    assert_eq!(route, Some(Route::Customer));
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_server_rejection_message_is_shown() {
    let mock = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = SessionContext::new();

    let mut view = LoginView::mount(store(&dir));
    view.set_email(CUSTOMER_EMAIL);
    view.set_password("wrong-password");

    assert_eq!(view.submit(&mock.client(), &mut session).await, None);
    assert_eq!(view.error.as_deref(), Some("Invalid email or password"));
    assert!(!view.loading);
    assert!(!session.is_authenticating());
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_unreachable_server_gives_generic_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = SessionContext::new();
    let config = packdesk::config::ApiConfig {
        base_url: "http://127.0.0.1:9/api".to_string(),
        resource_prefix: "/v1".to_string(),
        timeout_secs: 2,
    };
    let api = packdesk::ApiClient::new(&config).unwrap();

    let mut view = LoginView::mount(store(&dir));
    view.set_email(CUSTOMER_EMAIL);
    view.set_password(PASSWORD);

    assert_eq!(view.submit(&api, &mut session).await, None);
    assert_eq!(view.error.as_deref(), Some("Unexpected error. Please try again."));
}

#[tokio::test]
async fn test_logout_then_protected_route_resolves_to_login() {
    let mock = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = SessionContext::new();

    let mut view = LoginView::mount(store(&dir));
    view.set_email(ADMIN_EMAIL);
    view.set_password(PASSWORD);
    view.set_role(Role::Admin);
    view.submit(&mock.client(), &mut session).await;

    assert_eq!(router::resolve(Route::Admin, &mut session), Route::Admin);
    // Wrong role for the customer area
    assert_eq!(router::resolve(Route::Customer, &mut session), Route::Login);
    assert!(session.token().is_none());

    view.submit(&mock.client(), &mut session).await;
    assert!(session.logout(true));
    assert_eq!(session.role(), None);
    assert_eq!(router::resolve(Route::Admin, &mut session), Route::Login);
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let mock = MockApi::start().await;
    let api = mock.client();

    let mut view = RegisterView {
        name: "New Person".to_string(),
        email: "new@example.com".to_string(),
        phone: String::new(),
        password: "secret12".to_string(),
        ..RegisterView::default()
    };
    assert_eq!(view.submit(&api).await, Some(Route::Login));
    assert_eq!(view.error, None);

    view.email = TAKEN_EMAIL.to_string();
    assert_eq!(view.submit(&api).await, None);
    assert_eq!(view.error.as_deref(), Some("Email already registered"));
    assert_eq!(mock.state.hits("register"), 2);
}
