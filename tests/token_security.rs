//! Session token security tests.
//!
//! Verifies the critical properties of the token layer:
//!
//! - Refresh rotation is atomic: concurrent use of one token yields
//!   exactly one winner
//! - Reuse of a rotated-out token revokes the whole session family
//! - Revocation kills access tokens before their expiry
//! - Expired and tampered tokens are rejected with distinct errors

use authgate::mocks::{MockClock, MockSessionStore, MockTokenSigner};
use authgate::providers::SessionStore;
use authgate::state::{Identity, UserId};
use authgate::{AuthError, TokenConfig, TokenIssuer};
use chrono::Duration;
use std::sync::Arc;

type TestIssuer = TokenIssuer<MockSessionStore, MockTokenSigner, MockClock>;

struct Harness {
    issuer: TestIssuer,
    sessions: Arc<MockSessionStore>,
    clock: Arc<MockClock>,
    identity: Identity,
}

fn harness() -> Harness {
    let sessions = Arc::new(MockSessionStore::new());
    // The mock signer checks expiry against the real clock, so the test
    // clock starts at the real current time.
    let clock = Arc::new(MockClock::at_system_time());

    let config = TokenConfig::new(
        "test-signing-secret".to_string(),
        "https://app.test".to_string(),
        "authgate-tests".to_string(),
    );

    let issuer = TokenIssuer::new(
        config,
        Arc::clone(&sessions),
        MockTokenSigner::new(),
        Arc::clone(&clock),
    );

    Harness {
        issuer,
        sessions,
        clock,
        identity: Identity {
            user_id: UserId::new(),
            email: "user@test.com".to_string(),
            name: None,
        },
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_issue_then_verify_roundtrip() {
    let h = harness();

    let (session, tokens) = h.issuer.issue(&h.identity).await.unwrap();
    let verified = h.issuer.verify(&tokens.access_token).await.unwrap();

    assert_eq!(verified.user_id, h.identity.user_id);
    assert_eq!(verified.email, h.identity.email);
    assert_eq!(session.user_id, h.identity.user_id);
    assert!(tokens.expires_at > session.issued_at);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_expired_access_token_rejected_as_expired() {
    let h = harness();

    // Issue in the past: the access token's 15-minute life is over by
    // the time it is verified.
    h.clock.advance(Duration::hours(-1));
    let (_, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    let result = h.issuer.verify(&tokens.access_token).await;
    assert_eq!(result, Err(AuthError::TokenExpired));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_tampered_access_token_rejected_as_invalid() {
    let h = harness();
    let (_, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    let mut tampered = tokens.access_token.clone();
    tampered.truncate(tampered.len() - 4);
    tampered.push_str("AAAA");

    assert_eq!(h.issuer.verify(&tampered).await, Err(AuthError::TokenInvalid));
    assert_eq!(h.issuer.verify("").await, Err(AuthError::TokenInvalid));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_revocation_kills_live_access_token() {
    let h = harness();
    let (session, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    assert!(h.issuer.verify(&tokens.access_token).await.is_ok());

    h.issuer.revoke(session.session_id).await.unwrap();

    // The signature is still valid and the expiry has not passed, but a
    // revoked session's tokens must die immediately.
    assert_eq!(
        h.issuer.verify(&tokens.access_token).await,
        Err(AuthError::TokenInvalid)
    );
    assert_eq!(
        h.issuer.refresh(&tokens.refresh_token).await,
        Err(AuthError::TokenInvalid)
    );
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_refresh_rotates_token() {
    let h = harness();
    let (session, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    let (rotated_session, rotated) = h.issuer.refresh(&tokens.refresh_token).await.unwrap();

    assert_eq!(rotated_session.session_id, session.session_id);
    assert_ne!(rotated.refresh_token, tokens.refresh_token);
    assert!(h.issuer.verify(&rotated.access_token).await.is_ok());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_reuse_of_rotated_token_revokes_family() {
    let h = harness();
    let (_, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    let (_, rotated) = h.issuer.refresh(&tokens.refresh_token).await.unwrap();

    // Presenting the rotated-out token again is a compromise signal.
    let reuse = h.issuer.refresh(&tokens.refresh_token).await;
    assert_eq!(reuse, Err(AuthError::TokenInvalid));

    // The whole family dies with it, including the latest tokens.
    assert_eq!(
        h.issuer.refresh(&rotated.refresh_token).await,
        Err(AuthError::TokenInvalid)
    );
    assert_eq!(
        h.issuer.verify(&rotated.access_token).await,
        Err(AuthError::TokenInvalid)
    );
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_unknown_refresh_token_rejected_without_side_effects() {
    let h = harness();
    let (session, _) = h.issuer.issue(&h.identity).await.unwrap();

    let result = h.issuer.refresh("never-issued-token").await;
    assert_eq!(result, Err(AuthError::TokenInvalid));

    // A guessed token must not revoke anything.
    assert!(!h.sessions.is_revoked(session.session_id).await.unwrap());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_refresh_past_session_expiry_rejected_as_expired() {
    let h = harness();
    let (_, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    // Rotation never extends the session family's fixed 24-hour life.
    h.clock.advance(Duration::hours(25));

    let result = h.issuer.refresh(&tokens.refresh_token).await;
    assert_eq!(result, Err(AuthError::TokenExpired));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_concurrent_refresh_has_exactly_one_winner() {
    let h = harness();
    let (_, tokens) = h.issuer.issue(&h.identity).await.unwrap();

    let issuer1 = &h.issuer;
    let issuer2 = &h.issuer;
    let token1 = tokens.refresh_token.clone();
    let token2 = tokens.refresh_token.clone();

    let (result1, result2) = tokio::join!(
        async move { issuer1.refresh(&token1).await },
        async move { issuer2.refresh(&token2).await }
    );

    let success_count = [&result1, &result2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(
        success_count, 1,
        "Exactly one of two concurrent rotations of the same refresh token may succeed"
    );
}
