//! Concurrent refreshes with the same token.

mod common;

use passgate_auth::AuthError;
use passgate_database::store::SessionStore;

use common::{PASSWORD, harness};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let h = harness();
    h.identity.add("ada@example.com", true);

    for round in 0..20 {
        let bundle = h
            .orchestrator
            .login("ada@example.com", PASSWORD, "ip", "ua")
            .await
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let orchestrator = h.orchestrator.clone();
                let token = bundle.refresh_token.clone();
                tokio::spawn(async move { orchestrator.refresh(&token, "ip", "ua").await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(next) => winners.push(next),
                Err(e) => assert_eq!(e, AuthError::TokenInvalidOrExpired, "round {round}"),
            }
        }
        assert_eq!(winners.len(), 1, "round {round}");

        let session = h
            .store
            .find_by_session_id(&bundle.session_id)
            .await
            .unwrap()
            .unwrap();
        let tokens = h.store.tokens_for_session(session.id).await;
        assert_eq!(tokens.len(), 2, "round {round}");

        let consumed = tokens
            .iter()
            .find(|t| t.token == bundle.refresh_token)
            .unwrap();
        assert_eq!(
            consumed.replaced_by_token.as_deref(),
            Some(winners[0].refresh_token.as_str())
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_logout_racing_refresh_leaves_no_live_session() {
    let h = harness();
    h.identity.add("ada@example.com", true);

    for _ in 0..20 {
        let bundle = h
            .orchestrator
            .login("ada@example.com", PASSWORD, "ip", "ua")
            .await
            .unwrap();

        let refresher = {
            let orchestrator = h.orchestrator.clone();
            let token = bundle.refresh_token.clone();
            tokio::spawn(async move { orchestrator.refresh(&token, "ip", "ua").await })
        };
        let logout = {
            let orchestrator = h.orchestrator.clone();
            let sid = bundle.session_id.clone();
            tokio::spawn(async move { orchestrator.logout(&sid).await })
        };

        logout.await.unwrap().unwrap();
        if let Ok(next) = refresher.await.unwrap() {
            // a refresh that finished before the logout is now dead too
            assert!(
                !h.orchestrator
                    .validate_access_token(&next.access_token)
                    .await
                    .is_usable()
            );
        }
        assert!(
            !h.orchestrator
                .validate_access_token(&bundle.access_token)
                .await
                .is_usable()
        );
    }
}
