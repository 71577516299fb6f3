use crate::api::{Fulfillment, RequestId};
use crate::pool::SportsPool;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time;

/// One automation cycle: find the first due game under the read lock, then
/// request its result under the write lock, which re-validates.
pub async fn run_upkeep(
    state: &Arc<RwLock<SportsPool>>,
    now: DateTime<Utc>,
) -> Result<Option<RequestId>> {
    let upkeep = state.read().await.check_upkeep(now).await?;
    let Some(game) = upkeep.game else {
        return Ok(None);
    };
    let request = state.write().await.perform_upkeep(&game, now).await?;
    Ok(Some(request))
}

pub fn spawn_keeper(state: Arc<RwLock<SportsPool>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            match run_upkeep(&state, Utc::now()).await {
                Ok(Some(request)) => debug!("Upkeep issued result request {}", request),
                Ok(None) => trace!("No upkeep needed"),
                Err(e) => warn!("Upkeep failed: {:#}", e),
            }
        }
    })
}

/// Applies oracle answers as they arrive. Ends when every sender is gone.
pub fn spawn_fulfillment_listener(
    state: Arc<RwLock<SportsPool>>,
    mut fulfillments: UnboundedReceiver<Fulfillment>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(fulfillment) = fulfillments.recv().await {
            let mut pool = state.write().await;
            if let Err(e) = pool
                .fulfill_result(&fulfillment.request, fulfillment.outcome)
                .await
            {
                warn!("Fulfillment {} rejected: {:#}", fulfillment.request, e);
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::*;
    use crate::db::SQLite;
    use crate::forwarder::TestForwarder;
    use crate::funding_source::TestFundingSource;
    use crate::pool::PoolConfig;
    use crate::result_source::TestResultSource;
    use secp256k1::{generate_keypair, rand};
    use std::str::FromStr;
    use tokio::sync::mpsc;

    async fn pool(results: &TestResultSource) -> Arc<RwLock<SportsPool>> {
        let pool = SportsPool::new(
            Box::new(SQLite::new(None).await.unwrap()),
            Box::new(TestFundingSource::default()),
            Box::new(results.clone()),
            Box::new(TestForwarder::default()),
            PoolConfig::default(),
            vec![],
            true,
        )
        .await
        .unwrap();
        Arc::new(RwLock::new(pool))
    }
    fn access() -> AccessRequest {
        AccessRequest {
            user: UserPubKey::from_str("023d51452445aa81ecc3cfcb82dbfe937707db5c89f9f9d21d64835158df405d8c").unwrap(),
            sig: secp256k1::ecdsa::Signature::from_str("30440220208cef162c7081dafc61004daec32f5a3dadb4c6a1b4c0a479056a4962288d47022069022bc92673f73e9843cea14fa0cc46efa1b1e150339b603444c63035de21ee").unwrap(),
            challenge: "iT1HqC3oaoGjbSZEjAwpGZiCbzjtyz".to_string()
        }
    }
    async fn register(state: &Arc<RwLock<SportsPool>>, external_id: u128) -> GameId {
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let now = Utc::now();
        state
            .write()
            .await
            .register_and_predict(
                &user,
                Sport::Basketball,
                external_id,
                now + chrono::Duration::hours(1),
                GameResult::Home,
                10_000_000_000_000,
                access(),
                now,
            )
            .await
            .unwrap()
            .game
    }

    #[tokio::test]
    async fn upkeep_requests_due_games_only() {
        let results = TestResultSource::default();
        let state = pool(&results).await;
        let game = register(&state, 1).await;
        assert_eq!(run_upkeep(&state, Utc::now()).await.unwrap(), None);
        let later = Utc::now() + chrono::Duration::hours(4);
        let request = run_upkeep(&state, later).await.unwrap().unwrap();
        let sent = results.last_request().unwrap();
        assert_eq!(sent.id, request);
        assert_eq!(sent.game, game);
        assert_eq!(run_upkeep(&state, later).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listener_resolves_games() {
        let results = TestResultSource::default();
        let state = pool(&results).await;
        let game = register(&state, 1).await;
        let later = Utc::now() + chrono::Duration::hours(4);
        let request = run_upkeep(&state, later).await.unwrap().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let listener = spawn_fulfillment_listener(state.clone(), rx);
        tx.send(Fulfillment {
            request: "unknown".to_string(),
            outcome: Ok(GameResult::Away.to_word().to_vec()),
        })
        .unwrap();
        tx.send(Fulfillment {
            request,
            outcome: Ok(GameResult::Home.to_word().to_vec()),
        })
        .unwrap();
        drop(tx);
        listener.await.unwrap();

        let stored = state.read().await.get_game(&game).await.unwrap();
        assert_eq!(stored.state, GameState::Resolved(GameResult::Home));
    }
}
