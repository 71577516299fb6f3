use thiserror::Error;

use super::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Game {0} is already registered")]
    GameAlreadyRegistered(GameId),
    #[error("Game start has to be in the future")]
    TimestampInPast,
    #[error("Game {0} is not registered")]
    GameNotRegistered(GameId),
    #[error("Game {0} is already resolved or awaiting its result")]
    GameIsResolved(GameId),
    #[error("Game {0} already started")]
    GameAlreadyStarted(GameId),
    #[error("Prediction has to be Home or Away")]
    InvalidResult,
    #[error("Wager of {0} wei is below the minimum")]
    InsufficientValue(Wei),
    #[error("Wager of {0} wei is above the maximum")]
    ValueTooHigh(Wei),
    #[error("Game {0} can't be resolved yet")]
    GameNotReadyToResolve(GameId),
    #[error("Game {0} is not resolved yet")]
    GameNotResolved(GameId),
    #[error("Nothing to claim on game {0}")]
    NothingToClaim(GameId),
    #[error("There is no outstanding result request {0}")]
    UnexpectedRequestId(RequestId),
    #[error("There is no prediction {1} on game {0}")]
    PredictionNotFound(GameId, u32),
    #[error("No destination receiver set for cross domain transfers")]
    DestinationReceiverNotSet,
    #[error("Sport {0} is not supported")]
    UnsupportedSport(u8),
    #[error("Result word is malformed")]
    MalformedResult,
    #[error("Amount overflow")]
    AmountOverflow,
    #[error("Access Denied: {0}")]
    AccessDenied(String),
}
impl PoolError {
    /// Recovers the domain error behind an `anyhow::Error`, if there is one.
    pub fn of(e: &anyhow::Error) -> Option<&PoolError> {
        e.downcast_ref::<PoolError>()
    }
}
