use crate::api::*;

/// Pari-mutuel share of `total_pool` for `amount` staked on a side holding
/// `winning_pool`. Truncates; the remainder stays in the pool.
pub fn pari_mutuel_share(amount: Wei, total_pool: Wei, winning_pool: Wei) -> Result<Wei, PoolError> {
    if winning_pool == 0 {
        return Ok(0);
    }
    Ok(amount
        .checked_mul(total_pool)
        .ok_or(PoolError::AmountOverflow)?
        / winning_pool)
}

/// What a single prediction pays out on a resolved game.
pub fn prediction_payout(game: &Game, prediction: &Prediction) -> Result<Wei, PoolError> {
    match game.state {
        GameState::Resolved(GameResult::None) => Ok(prediction.amount),
        GameState::Resolved(result) if result == prediction.result => pari_mutuel_share(
            prediction.amount,
            game.total_pool()?,
            game.pool(result),
        ),
        _ => Ok(0),
    }
}

/// Sum over every unclaimed prediction, the amount a single claim releases.
pub fn claimable<'a>(
    game: &Game,
    predictions: impl IntoIterator<Item = &'a Prediction>,
) -> Result<Wei, PoolError> {
    let mut total: Wei = 0;
    for prediction in predictions.into_iter().filter(|p| !p.claimed) {
        total = total
            .checked_add(prediction_payout(game, prediction)?)
            .ok_or(PoolError::AmountOverflow)?;
    }
    Ok(total)
}

/// Projection for displaying a wager on `result` against the current pools.
pub fn calculate_winnings(game: &Game, wager: Wei, result: GameResult) -> Result<Wei, PoolError> {
    if result == GameResult::None {
        return Err(PoolError::InvalidResult);
    }
    match game.state {
        GameState::Resolved(GameResult::None) => Ok(wager),
        GameState::Resolved(outcome) if outcome != result => Ok(0),
        _ => pari_mutuel_share(wager, game.total_pool()?, game.pool(result)),
    }
}
