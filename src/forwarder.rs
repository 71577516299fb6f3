use crate::api::{Address, MessageId, Wei};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Outbound cross-domain transfer. `data` carries the ABI encoded
/// beneficiary on the destination domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardMessage {
    pub destination_selector: u64,
    pub receiver: Address,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    pub amount: Wei,
}

#[async_trait]
pub trait Forwarder {
    async fn forward(&self, message: ForwardMessage) -> Result<MessageId>;
}

#[derive(Debug, Default, Clone)]
pub struct TestForwarder {
    sent: Arc<Mutex<Vec<ForwardMessage>>>,
    fail: Arc<Mutex<bool>>,
}
impl TestForwarder {
    pub fn sent(&self) -> Vec<ForwardMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
    pub fn fail_forwards(&self, fail: bool) {
        if let Ok(mut flag) = self.fail.lock() {
            *flag = fail;
        }
    }
}
#[async_trait]
impl Forwarder for TestForwarder {
    async fn forward(&self, message: ForwardMessage) -> Result<MessageId> {
        if *self.fail.lock().map_err(|_| anyhow!("forwarder poisoned"))? {
            bail!("Bridge rejected the message")
        }
        let mut sent = self.sent.lock().map_err(|_| anyhow!("forwarder poisoned"))?;
        sent.push(message);
        Ok(format!("message-{}", sent.len()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SendResponse {
    message_id: MessageId,
}

/// Hands messages to a bridge service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    url: String,
}
impl HttpForwarder {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}
#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, message: ForwardMessage) -> Result<MessageId> {
        let response = self
            .client
            .post(self.url.clone() + "/send")
            .json(&message)
            .send()
            .await
            .context("couldn't reach bridge")?;
        if response.status() != StatusCode::OK {
            bail!("{}: {}", response.status(), response.text().await?)
        }
        Ok(response.json::<SendResponse>().await?.message_id)
    }
}
