use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Wei = u128;
pub type UserPubKey = secp256k1::PublicKey;
pub type RowId = i64;
pub type RequestId = String;
pub type MessageId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Sport {
    Basketball = 1,
    Baseball = 2,
    Hockey = 3,
    Rugby = 4,
    Soccer = 5,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameResult {
    None = 0,
    Home = 1,
    Away = 2,
}
/// Canonical game identifier, the 256 bit word `sport << 128 | external_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameId {
    pub sport: Sport,
    pub external_id: u128,
}
/// 20 byte account address, `hash160` of the compressed public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Active,
    AwaitingResult { requested_at: DateTime<Utc> },
    Resolved(GameResult),
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub sport: Sport,
    pub external_id: u128,
    pub timestamp: DateTime<Utc>,
    pub home_wager_amount: Wei,
    pub away_wager_amount: Wei,
    pub state: GameState,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub game: GameId,
    pub index: u32,
    pub result: GameResult,
    pub amount: Wei,
    pub claimed: bool,
}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum UserRole {
    User,
    Admin,
    Root,
}
