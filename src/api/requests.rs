use chrono::{DateTime, Utc};
use secp256k1::ecdsa::Signature;
use serde::{Deserialize, Serialize};

use super::*;

// Requests
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccessRequest {
    pub user: UserPubKey,
    pub challenge: String,
    pub sig: Signature,
}
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PostRequest<T> {
    pub access: AccessRequest,
    pub data: T,
}
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginRequest {
    pub user: UserPubKey,
    pub challenge: String,
    pub sig: Signature,
}
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RegisterAndPredictRequest {
    pub user: UserPubKey,
    pub sport: Sport,
    pub external_id: u128,
    pub timestamp: DateTime<Utc>,
    pub result: GameResult,
    pub amount: Wei,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictRequest {
    pub user: UserPubKey,
    pub game: GameId,
    pub result: GameResult,
    pub amount: Wei,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClaimRequest {
    pub user: UserPubKey,
    pub game: GameId,
    pub cross_domain: bool,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameIdRequest {
    pub sport: Sport,
    pub external_id: u128,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameRequest {
    pub game: GameId,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserRequest {
    pub user: UserPubKey,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionCorrectRequest {
    pub user: UserPubKey,
    pub game: GameId,
    pub index: u32,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CalculateWinningsRequest {
    pub game: GameId,
    pub wager: Wei,
    pub result: GameResult,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PerformUpkeepRequest {
    pub game: GameId,
}
/// Oracle callback: either the 32 byte result word or the failure reason.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Fulfillment {
    pub request: RequestId,
    pub outcome: Result<Vec<u8>, String>,
}
