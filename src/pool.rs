use crate::api::*;
use crate::forwarder::{ForwardMessage, Forwarder};
use crate::payout;
use crate::result_source::{ResultRequest, ResultSource};
use crate::{db::DB, funding_source::FundingSource};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, trace, warn};
use secp256k1::ecdsa::Signature;
use secp256k1::hashes::sha256::Hash;
use secp256k1::rand::distributions::Alphanumeric;
use secp256k1::rand::Rng;
use secp256k1::{rand, Message};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub min_wager: Wei,
    pub max_wager: Wei,
    /// Time after the scheduled start before a game may be resolved.
    pub resolve_delay: Duration,
    /// Age after which an unanswered result request counts as lost.
    pub request_timeout: Duration,
    pub destination_selector: u64,
    pub destination_receiver: Option<Address>,
}
impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_wager: 10_000_000_000_000,
            max_wager: 10_000_000_000_000_000,
            resolve_delay: Duration::hours(2),
            request_timeout: Duration::minutes(5),
            destination_selector: 0,
            destination_receiver: None,
        }
    }
}

/// Settlement engine: game registry, prediction book, resolution state
/// machine and payouts over a single ledger.
pub struct SportsPool {
    db: Arc<Box<dyn DB + Send + Sync>>,
    funding: Arc<Box<dyn FundingSource + Send + Sync>>,
    results: Arc<Box<dyn ResultSource + Send + Sync>>,
    forwarder: Arc<Box<dyn Forwarder + Send + Sync>>,
    config: PoolConfig,
    test: bool,
}

impl SportsPool {
    pub async fn new(
        db: Box<dyn DB + Send + Sync>,
        funding: Box<dyn FundingSource + Send + Sync>,
        results: Box<dyn ResultSource + Send + Sync>,
        forwarder: Box<dyn Forwarder + Send + Sync>,
        config: PoolConfig,
        admins: Vec<String>,
        test: bool,
    ) -> Result<Self> {
        let me = Self {
            db: Arc::new(db),
            funding: Arc::new(funding),
            results: Arc::new(results),
            forwarder: Arc::new(forwarder),
            config,
            test,
        };
        for admin in admins {
            me.db
                .update_user_role(UserPubKey::from_str(admin.as_str())?, UserRole::Root)
                .await?;
        }
        if let Some(receiver) = me.config.destination_receiver {
            me.db.set_destination_receiver(&receiver).await?;
        }
        Ok(me)
    }
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
    pub fn get_game_id(&self, sport: Sport, external_id: u128) -> GameId {
        GameId::new(sport, external_id)
    }
    pub async fn get_game(&self, game: &GameId) -> Result<Game> {
        match self.db.get_game(game).await? {
            Some(game) => Ok(game),
            None => bail!(PoolError::GameNotRegistered(*game)),
        }
    }
    pub async fn get_active_games(&self) -> Result<Vec<GameId>> {
        self.db.get_active_games().await
    }
    fn check_prediction(
        &self,
        game: &Game,
        result: GameResult,
        amount: Wei,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if game.resolved() {
            bail!(PoolError::GameIsResolved(game.id()))
        }
        if now >= game.timestamp {
            bail!(PoolError::GameAlreadyStarted(game.id()))
        }
        if result == GameResult::None {
            bail!(PoolError::InvalidResult)
        }
        if amount == 0 || amount < self.config.min_wager {
            bail!(PoolError::InsufficientValue(amount))
        }
        if amount > self.config.max_wager {
            bail!(PoolError::ValueTooHigh(amount))
        }
        Ok(())
    }
    // The stake is taken before the ledger write and handed back if the
    // write fails.
    async fn refund_on_err<T>(&self, user: &UserPubKey, amount: Wei, written: Result<T>) -> Result<T> {
        if let Err(e) = &written {
            error!("Ledger write failed, refunding {} wei to {}: {:#}", amount, user, e);
            if let Err(e) = self.funding.release(user, amount).await {
                error!("Refund of {} wei to {} failed: {:#}", amount, user, e);
            }
        }
        written
    }
    /// Registers the game on its first prediction.
    pub async fn register_and_predict(
        &mut self,
        user: &UserPubKey,
        sport: Sport,
        external_id: u128,
        timestamp: DateTime<Utc>,
        result: GameResult,
        amount: Wei,
        access: AccessRequest,
        now: DateTime<Utc>,
    ) -> Result<PredictResponse> {
        self.check_access_for_user(*user, access).await?;
        let id = self.get_game_id(sport, external_id);
        if self.db.get_game(&id).await?.is_some() {
            bail!(PoolError::GameAlreadyRegistered(id))
        }
        if timestamp <= now {
            bail!(PoolError::TimestampInPast)
        }
        let game = Game {
            sport,
            external_id,
            timestamp,
            home_wager_amount: 0,
            away_wager_amount: 0,
            state: GameState::Active,
        };
        self.check_prediction(&game, result, amount, now)?;
        self.funding
            .collect(user, amount)
            .await
            .context("couldn't collect stake")?;
        let written = self.db.add_game(&game, user, result, amount).await;
        let index = self.refund_on_err(user, amount, written).await?;
        info!("Game {} registered, starting at {}", id, timestamp);
        info!(
            "Prediction {} of {} on game {}: {} for {} wei",
            index, user, id, result, amount
        );
        Ok(PredictResponse { game: id, index })
    }
    pub async fn predict(
        &mut self,
        user: &UserPubKey,
        game: &GameId,
        result: GameResult,
        amount: Wei,
        access: AccessRequest,
        now: DateTime<Utc>,
    ) -> Result<PredictResponse> {
        self.check_access_for_user(*user, access).await?;
        let stored = self.get_game(game).await?;
        self.check_prediction(&stored, result, amount, now)?;
        self.funding
            .collect(user, amount)
            .await
            .context("couldn't collect stake")?;
        let written = self.db.add_prediction(user, game, result, amount).await;
        let index = self.refund_on_err(user, amount, written).await?;
        info!(
            "Prediction {} of {} on game {}: {} for {} wei",
            index, user, game, result, amount
        );
        Ok(PredictResponse { game: *game, index })
    }
    async fn get_predictions_by_resolved(
        &self,
        user: &UserPubKey,
        resolved: bool,
    ) -> Result<Vec<Prediction>> {
        let mut games: HashMap<GameId, bool> = HashMap::new();
        let mut predictions = Vec::new();
        for prediction in self.db.get_user_predictions(user).await? {
            let game_resolved = match games.get(&prediction.game) {
                Some(r) => *r,
                None => {
                    let r = self.get_game(&prediction.game).await?.resolved();
                    games.insert(prediction.game, r);
                    r
                }
            };
            if game_resolved == resolved {
                predictions.push(prediction);
            }
        }
        Ok(predictions)
    }
    pub async fn get_active_predictions(&self, user: &UserPubKey) -> Result<Vec<Prediction>> {
        self.get_predictions_by_resolved(user, false).await
    }
    pub async fn get_past_predictions(&self, user: &UserPubKey) -> Result<Vec<Prediction>> {
        self.get_predictions_by_resolved(user, true).await
    }
    pub async fn is_prediction_correct(
        &self,
        user: &UserPubKey,
        game: &GameId,
        index: u32,
    ) -> Result<bool> {
        let stored = self.get_game(game).await?;
        let prediction = self
            .db
            .get_user_game_predictions(user, game)
            .await?
            .into_iter()
            .map(|(_, p)| p)
            .find(|p| p.index == index)
            .ok_or(PoolError::PredictionNotFound(*game, index))?;
        Ok(stored.resolved() && stored.result() == prediction.result)
    }
    pub async fn calculate_winnings(
        &self,
        game: &GameId,
        wager: Wei,
        result: GameResult,
    ) -> Result<Wei> {
        let stored = self.get_game(game).await?;
        Ok(payout::calculate_winnings(&stored, wager, result)?)
    }
    /// Pays out every unclaimed prediction of `user` on a resolved game,
    /// locally or by forwarding to the destination domain.
    pub async fn claim(
        &mut self,
        user: &UserPubKey,
        game: &GameId,
        cross_domain: bool,
        access: AccessRequest,
    ) -> Result<ClaimReceipt> {
        self.check_access_for_user(*user, access).await?;
        let stored = self.get_game(game).await?;
        if !stored.resolved() {
            bail!(PoolError::GameNotResolved(*game))
        }
        let (rows, predictions): (Vec<RowId>, Vec<Prediction>) = self
            .db
            .get_user_game_predictions(user, game)
            .await?
            .into_iter()
            .filter(|(_, p)| !p.claimed)
            .unzip();
        let amount = payout::claimable(&stored, &predictions)?;
        if amount == 0 {
            bail!(PoolError::NothingToClaim(*game))
        }
        let receiver = if cross_domain {
            match self.db.get_destination_receiver().await? {
                Some(receiver) => Some(receiver),
                None => bail!(PoolError::DestinationReceiverNotSet),
            }
        } else {
            None
        };
        self.db.set_claimed(&rows, true).await?;
        let released = match receiver {
            Some(receiver) => {
                let message = ForwardMessage {
                    destination_selector: self.config.destination_selector,
                    receiver,
                    data: Address::of(user).abi_encode(),
                    amount,
                };
                self.forwarder.forward(message).await.map(Some)
            }
            None => self.funding.release(user, amount).await.map(|_| None),
        };
        let transfer_request = match released {
            Ok(transfer_request) => transfer_request,
            Err(e) => {
                error!(
                    "Releasing {} wei to {} failed, unclaiming: {:#}",
                    amount, user, e
                );
                if let Err(rollback) = self.db.set_claimed(&rows, false).await {
                    error!(
                        "Predictions {:?} of {} on game {} stay claimed without payout: {:#}",
                        rows, user, game, rollback
                    );
                    return Err(rollback);
                }
                return Err(e);
            }
        };
        info!("{} claimed {} wei on game {}", user, amount, game);
        if let Some(message) = &transfer_request {
            info!("Transfer request {} sent for {}", message, user);
        }
        Ok(ClaimReceipt {
            amount,
            transfer_request,
        })
    }
    fn is_due(&self, game: &Game, now: DateTime<Utc>) -> bool {
        match game.state {
            GameState::Active => now >= game.timestamp + self.config.resolve_delay,
            GameState::AwaitingResult { requested_at } => {
                now >= requested_at + self.config.request_timeout
            }
            GameState::Resolved(_) => false,
        }
    }
    /// First active game, in active set order, that is due for a result
    /// request.
    pub async fn check_upkeep(&self, now: DateTime<Utc>) -> Result<UpkeepResponse> {
        for id in self.db.get_active_games().await? {
            let game = self.get_game(&id).await?;
            if self.is_due(&game, now) {
                trace!("Game {} is due for resolution", id);
                return Ok(UpkeepResponse {
                    upkeep_needed: true,
                    game: Some(id),
                });
            }
        }
        Ok(UpkeepResponse {
            upkeep_needed: false,
            game: None,
        })
    }
    pub async fn perform_upkeep(&mut self, game: &GameId, now: DateTime<Utc>) -> Result<RequestId> {
        let stored = self.get_game(game).await?;
        match stored.state {
            GameState::Resolved(_) => bail!(PoolError::GameIsResolved(*game)),
            GameState::AwaitingResult { .. } if !self.is_due(&stored, now) => {
                bail!(PoolError::GameIsResolved(*game))
            }
            _ => {}
        }
        if now < stored.timestamp + self.config.resolve_delay {
            bail!(PoolError::GameNotReadyToResolve(*game))
        }
        let request: RequestId = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();
        self.db.add_request(game, &request, now).await?;
        let sent = self
            .results
            .request_result(ResultRequest {
                id: request.clone(),
                game: *game,
            })
            .await;
        if let Err(e) = sent {
            warn!("Result request for game {} failed: {:#}", game, e);
            self.db.cancel_request(game, &request).await?;
            return Err(e);
        }
        info!("Result requested for game {}: {}", game, request);
        Ok(request)
    }
    /// Applies an oracle answer. Failed or malformed answers drop the request
    /// and yield `None`, the game is due again once no retry is outstanding.
    pub async fn fulfill_result(
        &mut self,
        request: &RequestId,
        outcome: Result<Vec<u8>, String>,
    ) -> Result<Option<GameResult>> {
        let game = match self.db.get_request(request).await? {
            Some(game) => game,
            None => bail!(PoolError::UnexpectedRequestId(request.clone())),
        };
        if self.get_game(&game).await?.resolved() {
            bail!(PoolError::GameIsResolved(game))
        }
        let result = outcome.and_then(|word| GameResult::from_word(&word).map_err(|e| e.to_string()));
        match result {
            Ok(result) => {
                self.db.resolve_game(&game, result).await?;
                info!("Game {} resolved: {}", game, result);
                Ok(Some(result))
            }
            Err(e) => {
                warn!("Request {} for game {} failed: {}", request, game, e);
                self.db.cancel_request(&game, request).await?;
                Ok(None)
            }
        }
    }
    pub async fn set_destination_receiver(
        &mut self,
        receiver: Address,
        access: AccessRequest,
    ) -> Result<()> {
        self.check_admin(access).await?;
        self.db.set_destination_receiver(&receiver).await?;
        info!("Destination receiver set to {}", receiver);
        Ok(())
    }
    pub async fn get_destination_receiver(&self) -> Result<Option<Address>> {
        self.db.get_destination_receiver().await
    }
    pub async fn check_access(&self, access: AccessRequest) -> Result<UserRole> {
        if self.test {
            return Ok(UserRole::Root);
        }
        let challenge = self
            .db
            .get_login_challenge(access.user)
            .await
            .map_err(|_| PoolError::AccessDenied(format!("{} never logged in", access.user)))?;
        if challenge != access.challenge {
            debug!("User {} tried to access with a stale challenge", access.user);
            bail!(PoolError::AccessDenied("Challenge is outdated".to_string()))
        }
        let (db_sig, last_access) = self
            .db
            .get_last_access(access.user)
            .await
            .map_err(|_| PoolError::AccessDenied(format!("{} never logged in", access.user)))?;
        if access.sig != db_sig {
            debug!(
                "User {} tried to access with invalid access token",
                access.user
            );
            bail!(PoolError::AccessDenied(format!(
                "Access token for user {} is invalid",
                access.user
            )))
        }
        if last_access < Utc::now() - Duration::days(7) {
            debug!(
                "User {} tried to access after more than 7 days",
                access.user
            );
            bail!(PoolError::AccessDenied(
                "Last access was more than 7 days ago".to_string()
            ))
        }
        self.db.get_user_role(access.user).await
    }
    pub async fn check_access_for_user(
        &self,
        user: UserPubKey,
        access: AccessRequest,
    ) -> Result<()> {
        if let UserRole::User = self.check_access(access.clone()).await? {
            if user != access.user {
                bail!(PoolError::AccessDenied(
                    "Cannot issue request on behalf of other users".to_string()
                ));
            }
        }
        Ok(())
    }
    pub async fn check_admin(&self, access: AccessRequest) -> Result<()> {
        if let UserRole::User = self.check_access(access).await? {
            bail!(PoolError::AccessDenied("Admin only".to_string()));
        }
        Ok(())
    }
    pub async fn check_login(&self, access: AccessRequest) -> Result<UserResponse> {
        let role = self.check_access(access.clone()).await?;
        Ok(UserResponse {
            user: access.user,
            address: Address::of(&access.user),
            role,
        })
    }
    pub async fn create_login_challenge(&mut self, user: UserPubKey) -> Result<String> {
        let challenge: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();
        trace!("Generated login challenge {}", challenge);
        self.db
            .update_login_challenge(user, challenge.clone())
            .await?;
        Ok(challenge)
    }
    pub async fn try_login(
        &mut self,
        user: UserPubKey,
        sig: Signature,
        challenge: String,
    ) -> Result<()> {
        if self.db.get_login_challenge(user).await? != challenge {
            bail!(PoolError::AccessDenied("Unknown login challenge".to_string()))
        }
        sig.verify(
            &Message::from_hashed_data::<Hash>(challenge.as_bytes()),
            &user,
        )
        .map_err(|_| PoolError::AccessDenied("Invalid signature".to_string()))?;
        self.db.update_access_token(user, sig).await?;
        Ok(())
    }
}
