use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::*;

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct GameResponse {
    pub id: GameId,
    pub sport: Sport,
    pub external_id: u128,
    pub timestamp: DateTime<Utc>,
    pub home_wager_amount: Wei,
    pub away_wager_amount: Wei,
    pub resolved: bool,
    pub result: GameResult,
    pub state: GameState,
}
impl From<Game> for GameResponse {
    fn from(game: Game) -> Self {
        Self {
            id: game.id(),
            sport: game.sport,
            external_id: game.external_id,
            timestamp: game.timestamp,
            home_wager_amount: game.home_wager_amount,
            away_wager_amount: game.away_wager_amount,
            resolved: game.resolved(),
            result: game.result(),
            state: game.state,
        }
    }
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct PredictResponse {
    pub game: GameId,
    pub index: u32,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ClaimReceipt {
    pub amount: Wei,
    pub transfer_request: Option<MessageId>,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct UpkeepResponse {
    pub upkeep_needed: bool,
    pub game: Option<GameId>,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct UserResponse {
    pub user: UserPubKey,
    pub address: Address,
    pub role: UserRole,
}
