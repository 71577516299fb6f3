use log::debug;
use reqwest::StatusCode;

use super::PoolError;

pub fn map_any_err_and_code(e: anyhow::Error) -> (StatusCode, String) {
    debug!("Error: {:#}", e);
    let code = match PoolError::of(&e) {
        Some(PoolError::GameNotRegistered(_))
        | Some(PoolError::UnexpectedRequestId(_))
        | Some(PoolError::PredictionNotFound(..)) => StatusCode::NOT_FOUND,
        Some(PoolError::GameAlreadyRegistered(_))
        | Some(PoolError::GameIsResolved(_))
        | Some(PoolError::GameAlreadyStarted(_))
        | Some(PoolError::GameNotReadyToResolve(_))
        | Some(PoolError::GameNotResolved(_))
        | Some(PoolError::NothingToClaim(_)) => StatusCode::CONFLICT,
        Some(PoolError::AccessDenied(_)) => StatusCode::UNAUTHORIZED,
        Some(PoolError::AmountOverflow) | None => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_REQUEST,
    };
    (code, format!("{:#}", e))
}
pub fn map_any_err(e: anyhow::Error) -> String {
    debug!("Error: {:#}", e);
    format!("{:#}", e)
}
