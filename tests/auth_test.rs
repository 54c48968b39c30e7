//! Account provisioning, first-login password set, sessions and resets.

mod common;

use common::TestApp;
use stocktrack_api::{entities::user::UserRole, errors::ServiceError};

#[tokio::test]
async fn provisioned_accounts_must_set_a_password_before_logging_in() {
    let app = TestApp::new().await;
    let user_id = app.seed_user("staff@example.com", UserRole::Staff).await;
    assert_eq!(user_id, "U001");

    // No password yet: login refused
    let err = app
        .auth
        .login("staff@example.com", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AuthError(_)));

    // First-login flow issues a session
    let session = app
        .auth
        .set_initial_password("staff@example.com", "correct horse battery")
        .await
        .unwrap();
    assert_eq!(session.user_id, "U001");
    assert_eq!(session.role, "Staff");

    // And the credentials now work
    let session = app
        .auth
        .login("staff@example.com", "correct horse battery")
        .await
        .unwrap();
    let verified = app.auth.verify_token(&session.token).unwrap();
    assert_eq!(verified.user_id, "U001");
    assert_eq!(verified.email, "staff@example.com");
    assert_eq!(verified.role, "Staff");
}

#[tokio::test]
async fn wrong_passwords_and_unknown_emails_are_rejected_alike() {
    let app = TestApp::new().await;
    app.seed_user("ops@example.com", UserRole::Manager).await;
    app.auth
        .set_initial_password("ops@example.com", "a decent password")
        .await
        .unwrap();

    let err = app
        .auth
        .login("ops@example.com", "not the password")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AuthError(_)));

    let err = app
        .auth
        .login("nobody@example.com", "a decent password")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AuthError(_)));
}

#[tokio::test]
async fn the_password_can_only_be_set_once() {
    let app = TestApp::new().await;
    app.seed_user("once@example.com", UserRole::Staff).await;
    app.auth
        .set_initial_password("once@example.com", "first password")
        .await
        .unwrap();

    let err = app
        .auth
        .set_initial_password("once@example.com", "second password")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn password_reset_tokens_are_single_use() {
    let app = TestApp::new().await;
    app.seed_user("reset@example.com", UserRole::Staff).await;
    app.auth
        .set_initial_password("reset@example.com", "old password")
        .await
        .unwrap();

    let token = app
        .auth
        .request_password_reset("reset@example.com")
        .await
        .unwrap();

    app.auth
        .reset_password(&token, "brand new password")
        .await
        .unwrap();

    // New credentials work, old ones do not
    assert!(app
        .auth
        .login("reset@example.com", "brand new password")
        .await
        .is_ok());
    assert!(app
        .auth
        .login("reset@example.com", "old password")
        .await
        .is_err());

    // The token was consumed
    let err = app
        .auth
        .reset_password(&token, "another password")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AuthError(_)));
}

#[tokio::test]
async fn duplicate_member_emails_are_refused() {
    let app = TestApp::new().await;
    app.seed_user("dup@example.com", UserRole::Staff).await;

    let err = app
        .services
        .users
        .create("Dup@Example.com", UserRole::Manager)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn member_ids_use_the_three_digit_sequence() {
    let app = TestApp::new().await;
    let first = app.seed_user("one@example.com", UserRole::Staff).await;
    let second = app.seed_user("two@example.com", UserRole::Admin).await;

    assert_eq!(first, "U001");
    assert_eq!(second, "U002");
}

#[tokio::test]
async fn member_email_updates_recheck_uniqueness() {
    let app = TestApp::new().await;
    let first = app.seed_user("alpha@example.com", UserRole::Staff).await;
    app.seed_user("beta@example.com", UserRole::Staff).await;

    // Renaming onto the other member's address is refused
    let err = app
        .services
        .users
        .update(&first, Some("beta@example.com"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Renaming onto a free address (and case-folding) succeeds
    let updated = app
        .services
        .users
        .update(&first, Some("Gamma@Example.com"), Some(UserRole::Manager))
        .await
        .unwrap();
    assert_eq!(updated.email, "gamma@example.com");
    assert_eq!(updated.role, "Manager");
}
