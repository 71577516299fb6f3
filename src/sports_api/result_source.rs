use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;

use super::SportsApiClient;
use crate::api::Fulfillment;
use crate::result_source::{ResultRequest, ResultSource};

/// Answers result requests from api-sports. Each request is fetched on its
/// own task and the outcome is sent back as a `Fulfillment`.
pub struct ApiSportsResultSource {
    client: SportsApiClient,
    fulfillments: UnboundedSender<Fulfillment>,
}
impl ApiSportsResultSource {
    pub fn new(client: SportsApiClient, fulfillments: UnboundedSender<Fulfillment>) -> Self {
        Self {
            client,
            fulfillments,
        }
    }
}
#[async_trait]
impl ResultSource for ApiSportsResultSource {
    async fn request_result(&self, request: ResultRequest) -> Result<()> {
        let client = self.client.clone();
        let fulfillments = self.fulfillments.clone();
        tokio::spawn(async move {
            let outcome = client
                .get_game_result(request.game.sport, request.game.external_id)
                .await
                .map(|result| result.to_word().to_vec())
                .map_err(|e| format!("{:#}", e));
            debug!("Result request {} answered: {:?}", request.id, outcome);
            let fulfillment = Fulfillment {
                request: request.id,
                outcome,
            };
            if let Err(e) = fulfillments.send(fulfillment) {
                warn!("Dropped fulfillment {}: listener is gone", e.0.request);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::*;
    use crate::db::SQLite;
    use crate::forwarder::TestForwarder;
    use crate::funding_source::TestFundingSource;
    use crate::pool::{PoolConfig, SportsPool};
    use crate::sports_api::mock_api;
    use chrono::{Duration, Utc};
    use reqwest::StatusCode;
    use secp256k1::{generate_keypair, rand};
    use serde_json::{json, Value};
    use std::str::FromStr;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn access() -> AccessRequest {
        AccessRequest {
            user: UserPubKey::from_str("023d51452445aa81ecc3cfcb82dbfe937707db5c89f9f9d21d64835158df405d8c").unwrap(),
            sig: secp256k1::ecdsa::Signature::from_str("30440220208cef162c7081dafc61004daec32f5a3dadb4c6a1b4c0a479056a4962288d47022069022bc92673f73e9843cea14fa0cc46efa1b1e150339b603444c63035de21ee").unwrap(),
            challenge: "iT1HqC3oaoGjbSZEjAwpGZiCbzjtyz".to_string()
        }
    }
    // Registers one basketball game against a mocked api-sports and requests
    // its result.
    async fn requested(
        status: StatusCode,
        body: Value,
    ) -> (SportsPool, GameId, UnboundedReceiver<Fulfillment>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let results = ApiSportsResultSource::new(mock_api(status, body).await, tx);
        let mut pool = SportsPool::new(
            Box::new(SQLite::new(None).await.unwrap()),
            Box::new(TestFundingSource::default()),
            Box::new(results),
            Box::new(TestForwarder::default()),
            PoolConfig::default(),
            vec![],
            true,
        )
        .await
        .unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let now = Utc::now();
        let game = pool
            .register_and_predict(
                &user,
                Sport::Basketball,
                42,
                now + Duration::hours(1),
                GameResult::Home,
                10_000_000_000_000,
                access(),
                now,
            )
            .await
            .unwrap()
            .game;
        pool.perform_upkeep(&game, now + Duration::hours(4))
            .await
            .unwrap();
        (pool, game, rx)
    }
    async fn next(rx: &mut UnboundedReceiver<Fulfillment>) -> Fulfillment {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn failed_fetch_leaves_game_due() {
        let (mut pool, game, mut rx) = requested(StatusCode::BAD_GATEWAY, json!({})).await;
        let fulfillment = next(&mut rx).await;
        assert!(fulfillment.outcome.is_err());
        assert_eq!(
            pool.fulfill_result(&fulfillment.request, fulfillment.outcome)
                .await
                .unwrap(),
            None
        );
        assert_eq!(pool.get_game(&game).await.unwrap().state, GameState::Active);
        let later = Utc::now() + Duration::hours(4);
        assert_eq!(pool.check_upkeep(later).await.unwrap().game, Some(game));
    }

    #[tokio::test]
    async fn fetched_result_resolves_game() {
        let body = json!({
            "errors": [],
            "results": 1,
            "response": [{
                "status": {"short": "FT"},
                "scores": {"home": {"total": 100}, "away": {"total": 90}}
            }]
        });
        let (mut pool, game, mut rx) = requested(StatusCode::OK, body).await;
        let fulfillment = next(&mut rx).await;
        assert_eq!(
            pool.fulfill_result(&fulfillment.request, fulfillment.outcome)
                .await
                .unwrap(),
            Some(GameResult::Home)
        );
        assert!(pool.get_game(&game).await.unwrap().resolved());
    }
}
