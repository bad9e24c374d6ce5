//! Conditional writes of the PostgreSQL stores against a live database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p passgate-database -- --ignored`.
//! Every test works on its own freshly inserted user, so the suite can share
//! a database with other runs.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use passgate_core::config::database::DatabaseConfig;
use passgate_database::DatabasePool;
use passgate_database::migration::run_migrations;
use passgate_database::repositories::{RefreshTokenRepository, SessionRepository};
use passgate_database::store::{RefreshTokenStore, RotationOutcome, SessionStore};
use passgate_entity::session::{
    NewRefreshToken, NewSession, Session, SessionActivity, UNKNOWN_LOCATION,
};

struct TestDb {
    pool: PgPool,
    sessions: SessionRepository,
    tokens: RefreshTokenRepository,
}

impl TestDb {
    async fn connect() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = DatabasePool::connect(&DatabaseConfig::with_url(url))
            .await
            .expect("Failed to connect to test database")
            .into_pool();
        run_migrations(&pool).await.expect("Failed to run migrations");
        Self {
            sessions: SessionRepository::new(pool.clone()),
            tokens: RefreshTokenRepository::new(pool.clone()),
            pool,
        }
    }

    async fn create_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, 'unused')")
            .bind(id)
            .bind(format!("{id}@test.passgate"))
            .execute(&self.pool)
            .await
            .expect("Failed to create test user");
        id
    }

    async fn create_session(&self, user_id: Uuid) -> Session {
        self.sessions
            .insert(&NewSession {
                session_id: Uuid::new_v4().to_string(),
                user_id,
                ip_address: "10.0.0.1".to_string(),
                device_info: "integration".to_string(),
                location: UNKNOWN_LOCATION.to_string(),
                expires_at: Utc::now() + Duration::days(1),
            })
            .await
            .expect("Failed to create session")
    }

    async fn create_token(&self, session: &Session) -> String {
        let token = unique_token();
        self.tokens
            .insert(&new_token(session, &token))
            .await
            .expect("Failed to create refresh token");
        token
    }
}

fn unique_token() -> String {
    format!("{}-{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn new_token(session: &Session, value: &str) -> NewRefreshToken {
    NewRefreshToken {
        token: value.to_string(),
        session_id: session.id,
        expires_at: Utc::now() + Duration::days(1),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_rotate_has_one_winner() {
    let db = TestDb::connect().await;
    let user = db.create_user().await;
    let session = db.create_session(user).await;

    for _ in 0..10 {
        let consumed = db.create_token(&session).await;

        let rotations = (0..4).map(|_| {
            let tokens = db.tokens.clone();
            let consumed = consumed.clone();
            let successor = new_token(&session, &unique_token());
            tokio::spawn(async move { tokens.rotate(&consumed, &successor, "rotated").await })
        });
        let outcomes: Vec<RotationOutcome> = futures::future::join_all(rotations)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let winners: Vec<_> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RotationOutcome::Rotated(successor) => Some(successor),
                RotationOutcome::Lost => None,
            })
            .collect();
        assert_eq!(winners.len(), 1);

        let old = db.tokens.find_by_token(&consumed).await.unwrap().unwrap();
        assert!(old.revoked);
        assert_eq!(old.revoked_reason.as_deref(), Some("rotated"));
        assert_eq!(old.replaced_by_token.as_deref(), Some(winners[0].token.as_str()));
    }

    // each round leaves exactly its winner's successor live
    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM refresh_tokens WHERE session_id = $1 AND revoked = FALSE",
    )
    .bind(session.id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(live, 10);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rotate_refuses_revoked_and_expired_tokens() {
    let db = TestDb::connect().await;
    let user = db.create_user().await;
    let session = db.create_session(user).await;

    let revoked = db.create_token(&session).await;
    assert!(db.tokens.revoke(&revoked, "logout").await.unwrap());
    assert!(!db.tokens.revoke(&revoked, "logout").await.unwrap());

    let expired = unique_token();
    db.tokens
        .insert(&NewRefreshToken {
            expires_at: Utc::now() - Duration::seconds(1),
            ..new_token(&session, &expired)
        })
        .await
        .unwrap();

    for consumed in [&revoked, &expired] {
        let successor = new_token(&session, &unique_token());
        let outcome = db.tokens.rotate(consumed, &successor, "rotated").await.unwrap();
        assert!(!outcome.is_rotated());
        assert!(db.tokens.find_by_token(&successor.token).await.unwrap().is_none());
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_revoke_cascades_to_session_tokens() {
    let db = TestDb::connect().await;
    let user = db.create_user().await;
    let session = db.create_session(user).await;
    let other = db.create_session(user).await;

    let first = db.create_token(&session).await;
    let second = db.create_token(&session).await;
    let untouched = db.create_token(&other).await;

    assert!(db.sessions.revoke(&session.session_id, "logout").await.unwrap());
    assert!(!db.sessions.revoke(&session.session_id, "logout").await.unwrap());

    for value in [&first, &second] {
        let token = db.tokens.find_by_token(value).await.unwrap().unwrap();
        assert!(token.revoked);
        assert_eq!(token.revoked_reason.as_deref(), Some("logout"));
    }
    assert!(db.tokens.find_active_by_session(session.id).await.unwrap().is_none());

    let token = db.tokens.find_by_token(&untouched).await.unwrap().unwrap();
    assert!(!token.revoked);
    assert!(
        db.sessions
            .find_active_by_session_id(&other.session_id)
            .await
            .unwrap()
            .is_some()
    );

    let stored = db.sessions.find_by_id(session.id).await.unwrap().unwrap();
    assert!(stored.revoked);
    assert_eq!(stored.revoked_reason.as_deref(), Some("logout"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_revoke_all_for_user_returns_sessions_it_moved() {
    let db = TestDb::connect().await;
    let user = db.create_user().await;
    let bystander = db.create_user().await;

    let already_revoked = db.create_session(user).await;
    db.sessions
        .revoke(&already_revoked.session_id, "logout")
        .await
        .unwrap();
    let first = db.create_session(user).await;
    let second = db.create_session(user).await;
    let first_token = db.create_token(&first).await;
    let kept = db.create_session(bystander).await;
    let kept_token = db.create_token(&kept).await;

    let mut moved = db
        .sessions
        .revoke_all_for_user(user, "admin revoke")
        .await
        .unwrap();
    moved.sort();
    let mut expected = vec![first.session_id.clone(), second.session_id.clone()];
    expected.sort();
    assert_eq!(moved, expected);

    assert!(
        db.sessions
            .revoke_all_for_user(user, "admin revoke")
            .await
            .unwrap()
            .is_empty()
    );

    let token = db.tokens.find_by_token(&first_token).await.unwrap().unwrap();
    assert!(token.revoked);
    assert_eq!(token.revoked_reason.as_deref(), Some("admin revoke"));

    let earlier = db
        .sessions
        .find_by_session_id(&already_revoked.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(earlier.revoked_reason.as_deref(), Some("logout"));

    assert_eq!(db.sessions.find_active_by_user(bystander).await.unwrap().len(), 1);
    let token = db.tokens.find_by_token(&kept_token).await.unwrap().unwrap();
    assert!(!token.revoked);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_record_refresh_misses_revoked_session() {
    let db = TestDb::connect().await;
    let user = db.create_user().await;
    let session = db.create_session(user).await;
    let activity = SessionActivity {
        ip_address: "10.0.0.2".to_string(),
        device_info: "refreshed".to_string(),
        expires_at: Utc::now() + Duration::days(2),
    };

    assert!(db.sessions.record_refresh(session.id, &activity).await.unwrap());
    let stored = db.sessions.find_by_id(session.id).await.unwrap().unwrap();
    assert_eq!(stored.ip_address, "10.0.0.2");
    assert_eq!(stored.device_info, "refreshed");

    db.sessions.revoke(&session.session_id, "logout").await.unwrap();
    assert!(!db.sessions.record_refresh(session.id, &activity).await.unwrap());
    assert!(!db.sessions.touch(&session.session_id).await.unwrap());
}
