use crate::api::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secp256k1::ecdsa::Signature;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{query, Executor, Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

/// Ledger of games, predictions, the active game index, outstanding result
/// requests and user sessions. Every mutating method commits atomically.
#[async_trait]
pub trait DB {
    async fn get_game(&self, game: &GameId) -> Result<Option<Game>>;
    /// Stores a new game, appends it to the active set and records the
    /// prediction that registered it. Returns the prediction index.
    async fn add_game(
        &self,
        game: &Game,
        user: &UserPubKey,
        result: GameResult,
        amount: Wei,
    ) -> Result<u32>;
    /// Records a prediction and adds its amount to the matching pool.
    /// Returns the index among the user's predictions on that game.
    async fn add_prediction(
        &self,
        user: &UserPubKey,
        game: &GameId,
        result: GameResult,
        amount: Wei,
    ) -> Result<u32>;
    async fn get_user_predictions(&self, user: &UserPubKey) -> Result<Vec<Prediction>>;
    async fn get_user_game_predictions(
        &self,
        user: &UserPubKey,
        game: &GameId,
    ) -> Result<Vec<(RowId, Prediction)>>;
    async fn set_claimed(&self, predictions: &[RowId], claimed: bool) -> Result<()>;
    async fn get_active_games(&self) -> Result<Vec<GameId>>;
    /// Moves the game to `AwaitingResult` and stores the request correlation.
    async fn add_request(
        &self,
        game: &GameId,
        request: &RequestId,
        requested_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn get_request(&self, request: &RequestId) -> Result<Option<GameId>>;
    /// Drops the request. An awaiting game goes back to `Active` once no
    /// other request for it is outstanding.
    async fn cancel_request(&self, game: &GameId, request: &RequestId) -> Result<()>;
    /// Writes the result, removes the game from the active set and drops
    /// every outstanding request for it.
    async fn resolve_game(&self, game: &GameId, result: GameResult) -> Result<()>;
    async fn get_destination_receiver(&self) -> Result<Option<Address>>;
    async fn set_destination_receiver(&self, receiver: &Address) -> Result<()>;

    async fn update_user_role(&self, user: UserPubKey, role: UserRole) -> Result<()>;
    async fn get_user_role(&self, user: UserPubKey) -> Result<UserRole>;
    async fn update_login_challenge(&self, user: UserPubKey, challenge: String) -> Result<()>;
    async fn get_login_challenge(&self, user: UserPubKey) -> Result<String>;
    async fn update_access_token(&self, user: UserPubKey, sig: Signature) -> Result<()>;
    async fn get_last_access(&self, user: UserPubKey) -> Result<(Signature, DateTime<Utc>)>;
    async fn create_user(&self, user: UserPubKey) -> Result<()>;
}
pub struct SQLite {
    connection: SqlitePool,
}
impl SQLite {
    #[cfg(test)]
    pub fn connection(&self) -> SqlitePool {
        self.connection.clone()
    }
    pub async fn new(db_conn: Option<String>) -> Result<Self> {
        let connection = match db_conn {
            Some(url) => {
                let options = SqliteConnectOptions::from_str(url.as_str())
                    .with_context(|| format!("invalid database url {}", url))?
                    .create_if_missing(true);
                SqlitePoolOptions::new().connect_with(options).await?
            }
            // A memory database lives as long as its connection does.
            None => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect("sqlite::memory:")
                    .await?
            }
        };
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS games (\
                id TEXT PRIMARY KEY,\
                sport INTEGER NOT NULL,\
                external_id TEXT NOT NULL,\
                timestamp INTEGER NOT NULL,\
                home_wager_amount TEXT NOT NULL,\
                away_wager_amount TEXT NOT NULL,\
                state TEXT NOT NULL,\
                requested_at INTEGER,\
                result INTEGER\
                )",
            )
            .await?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS active_games (\
                position INTEGER PRIMARY KEY,\
                game TEXT NOT NULL UNIQUE\
                )",
            )
            .await?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS predictions (\
                user TEXT NOT NULL,\
                game TEXT NOT NULL,\
                idx INTEGER NOT NULL,\
                result INTEGER NOT NULL,\
                amount TEXT NOT NULL,\
                claimed BOOLEAN NOT NULL DEFAULT false,\
                PRIMARY KEY (user, game, idx)\
                )",
            )
            .await?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS requests (\
                id TEXT PRIMARY KEY,\
                game TEXT NOT NULL,\
                requested_at INTEGER NOT NULL\
                )",
            )
            .await?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS settings (\
                key TEXT PRIMARY KEY,\
                value TEXT NOT NULL\
                )",
            )
            .await?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS users (\
                pubkey,\
                last_access,\
                login_challenge,\
                access_token,\
                role DEFAULT User,\
                PRIMARY KEY (pubkey)\
                )",
            )
            .await?;
        Ok(Self { connection })
    }
    async fn insert_prediction(
        tx: &mut Transaction<'_, Sqlite>,
        user: &UserPubKey,
        game: &GameId,
        result: GameResult,
        amount: Wei,
    ) -> Result<u32> {
        let pool_column = match result {
            GameResult::Home => "home_wager_amount",
            GameResult::Away => "away_wager_amount",
            GameResult::None => return Err(PoolError::InvalidResult.into()),
        };
        let row = query("SELECT home_wager_amount, away_wager_amount FROM games WHERE id = ?")
            .bind(game.to_string())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(PoolError::GameNotRegistered(*game))?;
        let pool = get_wei(&row, pool_column)?
            .checked_add(amount)
            .ok_or(PoolError::AmountOverflow)?;
        query(&format!("UPDATE games SET {} = ? WHERE id = ?", pool_column))
            .bind(pool.to_string())
            .bind(game.to_string())
            .execute(&mut **tx)
            .await?;
        let index: i64 = query(
            "SELECT COUNT(*) AS count FROM predictions \
            WHERE user = ? AND game = ?",
        )
        .bind(user.to_string())
        .bind(game.to_string())
        .fetch_one(&mut **tx)
        .await?
        .try_get("count")?;
        query(
            "INSERT INTO predictions (\
            user,\
            game,\
            idx,\
            result,\
            amount,\
            claimed) \
            VALUES (?,?,?,?,?,false)",
        )
        .bind(user.to_string())
        .bind(game.to_string())
        .bind(index)
        .bind(u8::from(result))
        .bind(amount.to_string())
        .execute(&mut **tx)
        .await?;
        Ok(u32::try_from(index)?)
    }
    async fn remove_active_game(tx: &mut Transaction<'_, Sqlite>, game: &GameId) -> Result<()> {
        let Some(row) = query("SELECT position FROM active_games WHERE game = ?")
            .bind(game.to_string())
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(());
        };
        let position: i64 = row.try_get("position")?;
        let last: i64 = query("SELECT MAX(position) AS last FROM active_games")
            .fetch_one(&mut **tx)
            .await?
            .try_get("last")?;
        query("DELETE FROM active_games WHERE position = ?")
            .bind(position)
            .execute(&mut **tx)
            .await?;
        if position != last {
            query("UPDATE active_games SET position = ? WHERE position = ?")
                .bind(position)
                .bind(last)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}
fn get_wei(row: &SqliteRow, column: &str) -> Result<Wei> {
    let amount: String = row.try_get(column)?;
    amount
        .parse()
        .with_context(|| format!("couldn't parse {} as amount", column))
}
fn get_timestamp(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(anyhow!("timestamp {} out of range", seconds))
}
fn get_game_result(value: i64) -> Result<GameResult> {
    Ok(GameResult::try_from(u8::try_from(value)?)?)
}
fn game_from_row(row: &SqliteRow) -> Result<Game> {
    let sport: i64 = row.try_get("sport")?;
    let external_id: String = row.try_get("external_id")?;
    let state: String = row.try_get("state")?;
    let state = match state.as_str() {
        "Active" => GameState::Active,
        "AwaitingResult" => GameState::AwaitingResult {
            requested_at: get_timestamp(row.try_get("requested_at")?)?,
        },
        "Resolved" => GameState::Resolved(get_game_result(row.try_get("result")?)?),
        e => return Err(anyhow!("Error trying to read \"{}\" from db into GameState", e)),
    };
    Ok(Game {
        sport: Sport::try_from(u8::try_from(sport)?)?,
        external_id: external_id.parse()?,
        timestamp: get_timestamp(row.try_get("timestamp")?)?,
        home_wager_amount: get_wei(row, "home_wager_amount")?,
        away_wager_amount: get_wei(row, "away_wager_amount")?,
        state,
    })
}
fn prediction_from_row(row: &SqliteRow) -> Result<Prediction> {
    let game: String = row.try_get("game")?;
    let index: i64 = row.try_get("idx")?;
    Ok(Prediction {
        game: GameId::from_str(game.as_str())?,
        index: u32::try_from(index)?,
        result: get_game_result(row.try_get("result")?)?,
        amount: get_wei(row, "amount")?,
        claimed: row.try_get("claimed")?,
    })
}
#[async_trait]
impl DB for SQLite {
    async fn get_game(&self, game: &GameId) -> Result<Option<Game>> {
        let row = query("SELECT * FROM games WHERE id = ?")
            .bind(game.to_string())
            .fetch_optional(&self.connection)
            .await
            .with_context(|| format!("couldn't get game {}", game))?;
        row.as_ref().map(game_from_row).transpose()
    }
    async fn add_game(
        &self,
        game: &Game,
        user: &UserPubKey,
        result: GameResult,
        amount: Wei,
    ) -> Result<u32> {
        let id = game.id();
        let mut tx = self.connection.begin().await?;
        query(
            "INSERT INTO games (\
            id,\
            sport,\
            external_id,\
            timestamp,\
            home_wager_amount,\
            away_wager_amount,\
            state) \
            VALUES (?,?,?,?,?,?,'Active')",
        )
        .bind(id.to_string())
        .bind(u8::from(game.sport))
        .bind(game.external_id.to_string())
        .bind(game.timestamp.timestamp())
        .bind(game.home_wager_amount.to_string())
        .bind(game.away_wager_amount.to_string())
        .execute(&mut *tx)
        .await?;
        query(
            "INSERT INTO active_games (position, game) \
            VALUES ((SELECT COUNT(*) FROM active_games), ?)",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        let index = Self::insert_prediction(&mut tx, user, &id, result, amount).await?;
        tx.commit().await?;
        Ok(index)
    }
    async fn add_prediction(
        &self,
        user: &UserPubKey,
        game: &GameId,
        result: GameResult,
        amount: Wei,
    ) -> Result<u32> {
        let mut tx = self.connection.begin().await?;
        let index = Self::insert_prediction(&mut tx, user, game, result, amount).await?;
        tx.commit().await?;
        Ok(index)
    }
    async fn get_user_predictions(&self, user: &UserPubKey) -> Result<Vec<Prediction>> {
        let rows = query(
            "SELECT game, idx, result, amount, claimed FROM predictions \
            WHERE user = ? ORDER BY rowid",
        )
        .bind(user.to_string())
        .fetch_all(&self.connection)
        .await?;
        rows.iter().map(prediction_from_row).collect()
    }
    async fn get_user_game_predictions(
        &self,
        user: &UserPubKey,
        game: &GameId,
    ) -> Result<Vec<(RowId, Prediction)>> {
        let rows = query(
            "SELECT rowid, game, idx, result, amount, claimed FROM predictions \
            WHERE user = ? AND game = ? ORDER BY idx",
        )
        .bind(user.to_string())
        .bind(game.to_string())
        .fetch_all(&self.connection)
        .await?;
        rows.iter()
            .map(|row| -> Result<(RowId, Prediction)> {
                Ok((row.try_get("rowid")?, prediction_from_row(row)?))
            })
            .collect()
    }
    async fn set_claimed(&self, predictions: &[RowId], claimed: bool) -> Result<()> {
        let mut tx = self.connection.begin().await?;
        for prediction in predictions {
            query("UPDATE predictions SET claimed = ? WHERE rowid = ?")
                .bind(claimed)
                .bind(prediction)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
    async fn get_active_games(&self) -> Result<Vec<GameId>> {
        let rows = query("SELECT game FROM active_games ORDER BY position")
            .fetch_all(&self.connection)
            .await?;
        rows.iter()
            .map(|row| GameId::from_str(row.try_get("game")?))
            .collect()
    }
    async fn add_request(
        &self,
        game: &GameId,
        request: &RequestId,
        requested_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.connection.begin().await?;
        query(
            "UPDATE games SET \
            state = 'AwaitingResult', \
            requested_at = ? \
            WHERE id = ?",
        )
        .bind(requested_at.timestamp())
        .bind(game.to_string())
        .execute(&mut *tx)
        .await?;
        query("INSERT INTO requests (id, game, requested_at) VALUES (?,?,?)")
            .bind(request)
            .bind(game.to_string())
            .bind(requested_at.timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
    async fn get_request(&self, request: &RequestId) -> Result<Option<GameId>> {
        let row = query("SELECT game FROM requests WHERE id = ?")
            .bind(request)
            .fetch_optional(&self.connection)
            .await?;
        row.map(|row| GameId::from_str(row.try_get("game")?))
            .transpose()
    }
    async fn cancel_request(&self, game: &GameId, request: &RequestId) -> Result<()> {
        let mut tx = self.connection.begin().await?;
        query("DELETE FROM requests WHERE id = ?")
            .bind(request)
            .execute(&mut *tx)
            .await?;
        query(
            "UPDATE games SET \
            state = 'Active', \
            requested_at = NULL \
            WHERE id = ? AND state = 'AwaitingResult' \
            AND NOT EXISTS (SELECT 1 FROM requests WHERE game = ?)",
        )
        .bind(game.to_string())
        .bind(game.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
    async fn resolve_game(&self, game: &GameId, result: GameResult) -> Result<()> {
        let mut tx = self.connection.begin().await?;
        query(
            "UPDATE games SET \
            state = 'Resolved', \
            result = ? \
            WHERE id = ?",
        )
        .bind(u8::from(result))
        .bind(game.to_string())
        .execute(&mut *tx)
        .await?;
        Self::remove_active_game(&mut tx, game).await?;
        query("DELETE FROM requests WHERE game = ?")
            .bind(game.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
    async fn get_destination_receiver(&self) -> Result<Option<Address>> {
        let row = query("SELECT value FROM settings WHERE key = 'destination_receiver'")
            .fetch_optional(&self.connection)
            .await?;
        row.map(|row| Address::from_str(row.try_get("value")?))
            .transpose()
    }
    async fn set_destination_receiver(&self, receiver: &Address) -> Result<()> {
        query(
            "INSERT INTO settings (key, value) VALUES ('destination_receiver', ?) \
            ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(receiver.to_string())
        .execute(&self.connection)
        .await?;
        Ok(())
    }
    async fn update_user_role(&self, user: UserPubKey, role: UserRole) -> Result<()> {
        self.create_user(user).await?;
        let stmt = query(
            "UPDATE users SET \
            role = ? \
            WHERE pubkey = ?",
        );
        self.connection
            .execute(stmt.bind(role.to_string()).bind(user.to_string()))
            .await?;
        Ok(())
    }
    async fn get_user_role(&self, user: UserPubKey) -> Result<UserRole> {
        let stmt = query("SELECT role FROM users WHERE pubkey = ?");
        let row = self
            .connection
            .fetch_optional(stmt.bind(user.to_string()))
            .await?;
        match row {
            Some(row) => {
                let role: String = row.try_get("role")?;
                UserRole::from_str(role.as_str())
            }
            None => Ok(UserRole::default()),
        }
    }
    async fn update_login_challenge(&self, user: UserPubKey, challenge: String) -> Result<()> {
        self.create_user(user).await?;
        let stmt = query(
            "UPDATE users SET \
            login_challenge = ? \
            WHERE pubkey = ?",
        );
        self.connection
            .execute(stmt.bind(challenge).bind(user.to_string()))
            .await?;
        Ok(())
    }
    async fn get_login_challenge(&self, user: UserPubKey) -> Result<String> {
        let stmt = query(
            "SELECT login_challenge \
            FROM users \
            WHERE pubkey = ?",
        );
        let row = self
            .connection
            .fetch_one(stmt.bind(user.to_string()))
            .await
            .with_context(|| format!("no login challenge for user {}", user))?;
        let challenge: Option<String> = row.try_get("login_challenge")?;
        challenge.ok_or(anyhow!("no login challenge for user {}", user))
    }
    async fn update_access_token(&self, user: UserPubKey, sig: Signature) -> Result<()> {
        let stmt = query(
            "UPDATE users SET \
            access_token = ?, \
            last_access = ? \
            WHERE pubkey = ?",
        );
        self.connection
            .execute(
                stmt.bind(sig.to_string())
                    .bind(Utc::now().timestamp())
                    .bind(user.to_string()),
            )
            .await?;
        Ok(())
    }
    async fn get_last_access(&self, user: UserPubKey) -> Result<(Signature, DateTime<Utc>)> {
        let stmt = query(
            "SELECT access_token, last_access \
            FROM users \
            WHERE pubkey = ?",
        );
        let row = self
            .connection
            .fetch_one(stmt.bind(user.to_string()))
            .await?;
        let token: Option<String> = row.try_get("access_token")?;
        let token = token.ok_or(anyhow!("user {} never logged in", user))?;
        let last_access: i64 = row.try_get("last_access")?;
        Ok((
            Signature::from_str(token.as_str())?,
            get_timestamp(last_access)?,
        ))
    }
    async fn create_user(&self, user: UserPubKey) -> Result<()> {
        let stmt = query(
            "INSERT OR IGNORE INTO users \
            (pubkey) VALUES (?)",
        );
        self.connection.execute(stmt.bind(user.to_string())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;
    use secp256k1::{generate_keypair, rand};

    const WAGER: Wei = 10_000_000_000_000_000;

    fn new_game(external_id: u128) -> Game {
        Game {
            sport: Sport::Soccer,
            external_id,
            timestamp: Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap() + Duration::hours(1),
            home_wager_amount: 0,
            away_wager_amount: 0,
            state: GameState::Active,
        }
    }

    #[tokio::test]
    async fn game_and_first_prediction_are_stored_together() {
        let db = SQLite::new(None).await.unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let game = new_game(1);
        let index = db.add_game(&game, &user, GameResult::Home, WAGER).await.unwrap();
        assert_eq!(index, 0);
        let stored = db.get_game(&game.id()).await.unwrap().unwrap();
        assert_eq!(stored.home_wager_amount, WAGER);
        assert_eq!(stored.away_wager_amount, 0);
        assert_eq!(stored.timestamp, game.timestamp);
        assert_eq!(stored.state, GameState::Active);
        assert_eq!(db.get_active_games().await.unwrap(), vec![game.id()]);
    }

    #[tokio::test]
    async fn failed_registration_leaves_nothing_behind() {
        let db = SQLite::new(None).await.unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let game = new_game(1);
        db.add_game(&game, &user, GameResult::None, WAGER)
            .await
            .unwrap_err();
        assert!(db.get_game(&game.id()).await.unwrap().is_none());
        assert!(db.get_active_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prediction_indices_count_per_user_and_game() {
        let db = SQLite::new(None).await.unwrap();
        let (_, u1) = generate_keypair(&mut rand::thread_rng());
        let (_, u2) = generate_keypair(&mut rand::thread_rng());
        let game = new_game(1);
        db.add_game(&game, &u1, GameResult::Home, WAGER).await.unwrap();
        let id = game.id();
        assert_eq!(db.add_prediction(&u1, &id, GameResult::Away, WAGER).await.unwrap(), 1);
        assert_eq!(db.add_prediction(&u2, &id, GameResult::Away, WAGER).await.unwrap(), 0);
        let stored = db.get_game(&id).await.unwrap().unwrap();
        assert_eq!(stored.home_wager_amount, WAGER);
        assert_eq!(stored.away_wager_amount, 2 * WAGER);
        let predictions = db.get_user_game_predictions(&u1, &id).await.unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].1.result, GameResult::Away);
        assert!(!predictions[1].1.claimed);
    }

    #[tokio::test]
    async fn resolving_swaps_last_active_game_into_the_gap() {
        let db = SQLite::new(None).await.unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let games: Vec<Game> = (1..=4).map(new_game).collect();
        for game in &games {
            db.add_game(game, &user, GameResult::Home, WAGER).await.unwrap();
        }
        db.resolve_game(&games[1].id(), GameResult::Home)
            .await
            .unwrap();
        assert_eq!(
            db.get_active_games().await.unwrap(),
            vec![games[0].id(), games[3].id(), games[2].id()]
        );
        db.resolve_game(&games[2].id(), GameResult::Away)
            .await
            .unwrap();
        assert_eq!(
            db.get_active_games().await.unwrap(),
            vec![games[0].id(), games[3].id()]
        );
        let resolved = db.get_game(&games[2].id()).await.unwrap().unwrap();
        assert_eq!(resolved.state, GameState::Resolved(GameResult::Away));
    }

    #[tokio::test]
    async fn requests_correlate_to_games() {
        let db = SQLite::new(None).await.unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let game = new_game(1);
        db.add_game(&game, &user, GameResult::Home, WAGER).await.unwrap();
        let requested_at = Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap();
        let request = "request".to_string();
        db.add_request(&game.id(), &request, requested_at)
            .await
            .unwrap();
        assert_eq!(db.get_request(&request).await.unwrap(), Some(game.id()));
        assert_eq!(
            db.get_game(&game.id()).await.unwrap().unwrap().state,
            GameState::AwaitingResult { requested_at }
        );
        db.cancel_request(&game.id(), &request).await.unwrap();
        assert_eq!(db.get_request(&request).await.unwrap(), None);
        assert_eq!(
            db.get_game(&game.id()).await.unwrap().unwrap().state,
            GameState::Active
        );
    }

    #[tokio::test]
    async fn claimed_flags_toggle() {
        let db = SQLite::new(None).await.unwrap();
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let game = new_game(1);
        db.add_game(&game, &user, GameResult::Home, WAGER).await.unwrap();
        let rows: Vec<RowId> = db
            .get_user_game_predictions(&user, &game.id())
            .await
            .unwrap()
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        db.set_claimed(&rows, true).await.unwrap();
        assert!(db.get_user_predictions(&user).await.unwrap()[0].claimed);
        db.set_claimed(&rows, false).await.unwrap();
        assert!(!db.get_user_predictions(&user).await.unwrap()[0].claimed);
    }

    #[tokio::test]
    async fn destination_receiver_is_overwritten() {
        let db = SQLite::new(None).await.unwrap();
        assert_eq!(db.get_destination_receiver().await.unwrap(), None);
        db.set_destination_receiver(&Address([1; 20])).await.unwrap();
        db.set_destination_receiver(&Address([2; 20])).await.unwrap();
        assert_eq!(
            db.get_destination_receiver().await.unwrap(),
            Some(Address([2; 20]))
        );
    }
}
