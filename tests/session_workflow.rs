//! End-to-end session workflows through the `vestibule` facade.

use std::sync::Arc;
use vestibule::prelude::*;

fn service(sink: Arc<PrometheusSink>) -> SessionService {
    let config = SessionConfig::default()
        .with_key_prefix("app:session:")
        .with_default_expiration(1800);

    SessionService::builder(config)
        .backend(Arc::new(MemoryBackend::new()))
        .metrics_sink(sink)
        .build()
        .unwrap()
}

// =============================================================================
// Login / request / logout
// =============================================================================

#[tokio::test]
async fn test_login_request_logout() {
    let sink = Arc::new(PrometheusSink::new());
    let service = service(sink.clone());

    // First request: no cookie
    let (id, mut session) = service.find_session(None).await.unwrap();
    assert!(session.is_empty());

    // Login
    session.insert("user_id", 42);
    service
        .persist_session(&id, &mut session, PersistOptions::default())
        .await
        .unwrap();

    // Next request carries the cookie
    let (same, session) = service.find_session(Some(id.as_str())).await.unwrap();
    assert_eq!(same, id);
    assert_eq!(session.get("user_id").and_then(SessionValue::as_i64), Some(42));

    // Logout re-arms the cookie
    let next = service
        .delete_session(&id, DeleteOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(next, id);

    // The old cookie no longer resolves
    let (fresh, session) = service.find_session(Some(id.as_str())).await.unwrap();
    assert_ne!(fresh, id);
    assert!(session.is_empty());

    assert!(sink.export().contains("sessions_request_duration_ms_count 5"));
}

#[tokio::test]
async fn test_stolen_record_is_rejected() {
    let service = service(Arc::new(PrometheusSink::new()));

    let (victim, mut session) = service.find_session(None).await.unwrap();
    session.insert("user_id", 1);
    service
        .persist_session(&victim, &mut session, PersistOptions::default())
        .await
        .unwrap();

    // Copy the victim's record under another identifier
    let (attacker, _) = service.find_session(None).await.unwrap();
    service
        .store()
        .store(attacker.as_str(), &session, None)
        .await
        .unwrap();

    let err = service
        .find_session(Some(attacker.as_str()))
        .await
        .unwrap_err();
    assert!(err.is_identity_mismatch());
}

#[test]
fn test_redis_config_reexported() {
    let config = RedisConfig::builder()
        .url("redis://cache.internal:6379")
        .take_strategy(TakeStrategy::GetThenDel)
        .build();

    let config = SessionConfig::default().with_redis(config);
    assert_eq!(config.redis.url, "redis://cache.internal:6379");
    assert!(config.validate().is_ok());
}
