use crate::api::{GameId, RequestId};
use anyhow::Result;
#[cfg(test)]
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use log::info;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRequest {
    pub id: RequestId,
    pub game: GameId,
}

/// Asynchronous source of game results. Issuing a request returns as soon as
/// it is sent, the answer comes back later as a `Fulfillment` carrying the
/// same request id.
#[async_trait]
pub trait ResultSource {
    async fn request_result(&self, request: ResultRequest) -> Result<()>;
}

/// Logs requests and leaves the answer to an admin posting to
/// `/fulfill_result`.
#[derive(Debug, Default, Clone)]
pub struct ManualResultSource;
#[async_trait]
impl ResultSource for ManualResultSource {
    async fn request_result(&self, request: ResultRequest) -> Result<()> {
        info!(
            "Result request {} for game {} awaits a manual fulfillment",
            request.id, request.game
        );
        Ok(())
    }
}

/// Records requests, fulfillments are delivered by hand.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct TestResultSource {
    requests: Arc<Mutex<Vec<ResultRequest>>>,
    unreachable: Arc<Mutex<bool>>,
}
#[cfg(test)]
impl TestResultSource {
    pub fn requests(&self) -> Vec<ResultRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
    pub fn last_request(&self) -> Option<ResultRequest> {
        self.requests().pop()
    }
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut flag) = self.unreachable.lock() {
            *flag = unreachable;
        }
    }
}
#[cfg(test)]
#[async_trait]
impl ResultSource for TestResultSource {
    async fn request_result(&self, request: ResultRequest) -> Result<()> {
        if *self
            .unreachable
            .lock()
            .map_err(|_| anyhow!("result source poisoned"))?
        {
            bail!("Result source unreachable")
        }
        self.requests
            .lock()
            .map_err(|_| anyhow!("result source poisoned"))?
            .push(request);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::Sport;

    #[tokio::test]
    async fn manual_requests_are_accepted() {
        let request = ResultRequest {
            id: "request".to_string(),
            game: GameId::new(Sport::Hockey, 7),
        };
        assert!(ManualResultSource.request_result(request).await.is_ok());
    }
}
