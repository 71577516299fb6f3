use crate::api::{UserPubKey, Wei};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Where stakes come from and where local payouts go.
#[async_trait]
pub trait FundingSource {
    async fn collect(&self, user: &UserPubKey, amount: Wei) -> Result<()>;
    async fn release(&self, user: &UserPubKey, amount: Wei) -> Result<()>;
}
#[derive(Debug, Default, Clone)]
pub struct TestFundingSource {
    collected: Arc<Mutex<HashMap<UserPubKey, Wei>>>,
    released: Arc<Mutex<HashMap<UserPubKey, Wei>>>,
    fail_release: Arc<Mutex<bool>>,
}
impl TestFundingSource {
    pub fn collected(&self, user: &UserPubKey) -> Wei {
        self.collected
            .lock()
            .map(|c| c.get(user).copied().unwrap_or_default())
            .unwrap_or_default()
    }
    pub fn released(&self, user: &UserPubKey) -> Wei {
        self.released
            .lock()
            .map(|r| r.get(user).copied().unwrap_or_default())
            .unwrap_or_default()
    }
    /// Makes every following release fail until reset.
    pub fn fail_releases(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_release.lock() {
            *flag = fail;
        }
    }
}
#[async_trait]
impl FundingSource for TestFundingSource {
    async fn collect(&self, user: &UserPubKey, amount: Wei) -> Result<()> {
        let mut collected = self
            .collected
            .lock()
            .map_err(|_| anyhow!("funding source poisoned"))?;
        *collected.entry(*user).or_default() += amount;
        Ok(())
    }
    async fn release(&self, user: &UserPubKey, amount: Wei) -> Result<()> {
        if *self
            .fail_release
            .lock()
            .map_err(|_| anyhow!("funding source poisoned"))?
        {
            bail!("Release of {} wei to {} failed", amount, user)
        }
        let mut released = self
            .released
            .lock()
            .map_err(|_| anyhow!("funding source poisoned"))?;
        *released.entry(*user).or_default() += amount;
        Ok(())
    }
}
