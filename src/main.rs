use crate::api::*;
use crate::db::SQLite;
use crate::forwarder::{Forwarder, HttpForwarder, TestForwarder};
use crate::funding_source::TestFundingSource;
use crate::keeper::{spawn_fulfillment_listener, spawn_keeper};
use crate::pool::SportsPool;
use crate::result_source::{ManualResultSource, ResultSource};
use crate::settings::{Overrides, Settings};
use crate::sports_api::{ApiSportsResultSource, SportsApiClient};
use anyhow::Result;
use axum::extract::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use axum_macros::debug_handler;
use chrono::Utc;
use clap::Parser;
use env_logger::{Builder, WriteStyle};
use log::{debug, error, info, trace, warn, LevelFilter};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

mod api;
mod client;
mod db;
mod forwarder;
mod funding_source;
mod keeper;
mod payout;
mod pool;
mod result_source;
mod settings;
mod sports_api;

async fn get_login_challenge(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(user): Json<UserPubKey>,
) -> Result<String, (StatusCode, String)> {
    let mut backend = state.write().await;
    trace!("Getting login challenge for {}", user);
    let challenge = backend
        .create_login_challenge(user)
        .await
        .map_err(map_any_err_and_code)?;
    debug!("Login challenge for user {}: {}", user, challenge);
    Ok(challenge)
}
async fn try_login(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<LoginRequest>,
) -> Result<(), (StatusCode, String)> {
    let mut backend = state.write().await;
    backend
        .try_login(request.user, request.sig, request.challenge)
        .await
        .map_err(map_any_err_and_code)?;
    debug!("User {} successfully logged in", request.user);
    Ok(())
}
async fn check_login(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<AccessRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let backend = state.read().await;
    let user = backend
        .check_login(request)
        .await
        .map_err(|e| (StatusCode::UNAUTHORIZED, map_any_err(e)))?;
    Ok(Json(user))
}
#[debug_handler]
async fn register_and_predict(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PostRequest<RegisterAndPredictRequest>>,
) -> Result<(StatusCode, Json<PredictResponse>), (StatusCode, String)> {
    let mut backend = state.write().await;
    let (request, access) = (request.data, request.access);
    debug!(
        "Registering {} game {} with {} on {} for user {}",
        request.sport, request.external_id, request.amount, request.result, request.user
    );
    let response = backend
        .register_and_predict(
            &request.user,
            request.sport,
            request.external_id,
            request.timestamp,
            request.result,
            request.amount,
            access,
            Utc::now(),
        )
        .await
        .map_err(map_any_err_and_code)?;
    Ok((StatusCode::CREATED, Json(response)))
}
#[debug_handler]
async fn predict(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PostRequest<PredictRequest>>,
) -> Result<(StatusCode, Json<PredictResponse>), (StatusCode, String)> {
    let mut backend = state.write().await;
    let (request, access) = (request.data, request.access);
    debug!(
        "Adding {} on {} to game {} for user {}",
        request.amount, request.result, request.game, request.user
    );
    let response = backend
        .predict(
            &request.user,
            &request.game,
            request.result,
            request.amount,
            access,
            Utc::now(),
        )
        .await
        .map_err(map_any_err_and_code)?;
    Ok((StatusCode::CREATED, Json(response)))
}
async fn claim(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PostRequest<ClaimRequest>>,
) -> Result<Json<ClaimReceipt>, (StatusCode, String)> {
    let mut backend = state.write().await;
    let (request, access) = (request.data, request.access);
    let receipt = backend
        .claim(&request.user, &request.game, request.cross_domain, access)
        .await
        .map_err(map_any_err_and_code)?;
    debug!(
        "Claimed {} for user {} on game {}",
        receipt.amount, request.user, request.game
    );
    Ok(Json(receipt))
}
async fn get_game_id(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<GameIdRequest>,
) -> Json<GameId> {
    let backend = state.read().await;
    Json(backend.get_game_id(request.sport, request.external_id))
}
async fn get_game(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<GameRequest>,
) -> Result<Json<GameResponse>, (StatusCode, String)> {
    let backend = state.read().await;
    let game = backend
        .get_game(&request.game)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(game.into()))
}
async fn get_active_games(
    State(state): State<Arc<RwLock<SportsPool>>>,
) -> Result<Json<Vec<GameId>>, (StatusCode, String)> {
    let backend = state.read().await;
    let games = backend
        .get_active_games()
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(games))
}
async fn get_active_predictions(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<UserRequest>,
) -> Result<Json<Vec<Prediction>>, (StatusCode, String)> {
    let backend = state.read().await;
    let predictions = backend
        .get_active_predictions(&request.user)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(predictions))
}
async fn get_past_predictions(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<UserRequest>,
) -> Result<Json<Vec<Prediction>>, (StatusCode, String)> {
    let backend = state.read().await;
    let predictions = backend
        .get_past_predictions(&request.user)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(predictions))
}
async fn is_prediction_correct(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PredictionCorrectRequest>,
) -> Result<Json<bool>, (StatusCode, String)> {
    let backend = state.read().await;
    let correct = backend
        .is_prediction_correct(&request.user, &request.game, request.index)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(correct))
}
async fn calculate_winnings(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<CalculateWinningsRequest>,
) -> Result<Json<Wei>, (StatusCode, String)> {
    let backend = state.read().await;
    let winnings = backend
        .calculate_winnings(&request.game, request.wager, request.result)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(winnings))
}
async fn check_upkeep(
    State(state): State<Arc<RwLock<SportsPool>>>,
) -> Result<Json<UpkeepResponse>, (StatusCode, String)> {
    let backend = state.read().await;
    let upkeep = backend
        .check_upkeep(Utc::now())
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(upkeep))
}
async fn perform_upkeep(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PerformUpkeepRequest>,
) -> Result<Json<RequestId>, (StatusCode, String)> {
    let mut backend = state.write().await;
    let request_id = backend
        .perform_upkeep(&request.game, Utc::now())
        .await
        .map_err(map_any_err_and_code)?;
    debug!("Requested result for game {}: {}", request.game, request_id);
    Ok(Json(request_id))
}
async fn fulfill_result(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PostRequest<Fulfillment>>,
) -> Result<Json<Option<GameResult>>, (StatusCode, String)> {
    let mut backend = state.write().await;
    let (fulfillment, access) = (request.data, request.access);
    backend
        .check_admin(access)
        .await
        .map_err(map_any_err_and_code)?;
    let result = backend
        .fulfill_result(&fulfillment.request, fulfillment.outcome)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(result))
}
async fn set_destination_receiver(
    State(state): State<Arc<RwLock<SportsPool>>>,
    Json(request): Json<PostRequest<Address>>,
) -> Result<(), (StatusCode, String)> {
    let mut backend = state.write().await;
    backend
        .set_destination_receiver(request.data, request.access)
        .await
        .map_err(map_any_err_and_code)?;
    Ok(())
}
async fn get_destination_receiver(
    State(state): State<Arc<RwLock<SportsPool>>>,
) -> Result<Json<Option<Address>>, (StatusCode, String)> {
    let backend = state.read().await;
    let receiver = backend
        .get_destination_receiver()
        .await
        .map_err(map_any_err_and_code)?;
    Ok(Json(receiver))
}

#[derive(Parser)]
struct Args {
    #[arg(short, long)]
    admin: Vec<String>,
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(short, long)]
    test: bool,
    #[arg(short, long)]
    db: Option<String>,
    #[arg(short, long, default_value = "sportspool.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    Builder::default()
        .filter_level(LevelFilter::Debug)
        .write_style(WriteStyle::Always)
        .init();
    let cli = Args::parse();
    let settings = Settings::load(
        cli.config.as_str(),
        Overrides {
            port: cli.port,
            db: cli.db,
            admins: cli.admin,
            test: cli.test,
        },
    )?;
    let (_port, handle) = run_server(settings).await?;
    handle.await?;
    Ok(())
}

async fn run_server(settings: Settings) -> Result<(u16, JoinHandle<()>)> {
    let (fulfillments, fulfillment_receiver) = mpsc::unbounded_channel();
    let results: Box<dyn ResultSource + Send + Sync> = match &settings.sports_api_key {
        Some(api_key) => {
            let mut client = SportsApiClient::new(api_key.clone());
            if let Some(url) = &settings.sports_api_url {
                client = client.with_base_url(url.clone());
            }
            Box::new(ApiSportsResultSource::new(client, fulfillments))
        }
        None => {
            warn!("No sports_api_key set, results have to be posted to /fulfill_result");
            Box::new(ManualResultSource)
        }
    };
    let forwarder: Box<dyn Forwarder + Send + Sync> = match &settings.bridge_url {
        Some(url) => Box::new(HttpForwarder::new(url.clone())),
        None => {
            warn!("No bridge_url set, cross domain claims are only recorded");
            Box::new(TestForwarder::default())
        }
    };
    let pool = SportsPool::new(
        Box::new(SQLite::new(settings.db.clone()).await?),
        Box::new(TestFundingSource::default()),
        results,
        forwarder,
        settings.pool_config()?,
        settings.admins.clone(),
        settings.test,
    )
    .await?;
    let state = Arc::new(RwLock::new(pool));
    spawn_fulfillment_listener(state.clone(), fulfillment_receiver);
    if settings.upkeep_interval_secs > 0 {
        spawn_keeper(
            state.clone(),
            std::time::Duration::from_secs(settings.upkeep_interval_secs),
        );
    }
    let app = Router::new()
        .route("/get_login_challenge", post(get_login_challenge))
        .route("/try_login", post(try_login))
        .route("/check_login", post(check_login))
        .route("/register_and_predict", post(register_and_predict))
        .route("/predict", post(predict))
        .route("/claim", post(claim))
        .route("/get_game_id", post(get_game_id))
        .route("/get_game", post(get_game))
        .route("/get_active_games", get(get_active_games))
        .route("/get_active_predictions", post(get_active_predictions))
        .route("/get_past_predictions", post(get_past_predictions))
        .route("/is_prediction_correct", post(is_prediction_correct))
        .route("/calculate_winnings", post(calculate_winnings))
        .route("/check_upkeep", get(check_upkeep))
        .route("/perform_upkeep", post(perform_upkeep))
        .route("/fulfill_result", post(fulfill_result))
        .route("/set_destination_receiver", post(set_destination_receiver))
        .route("/get_destination_receiver", get(get_destination_receiver))
        .with_state(state);

    let addr: SocketAddr = ("127.0.0.1:".to_string() + settings.port.to_string().as_str()).parse()?;
    let server = axum::Server::try_bind(&addr)?.serve(app.into_make_service());
    let port = server.local_addr().port();
    info!("Listening on {}", server.local_addr());
    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Server stopped: {}", e);
        }
    });
    Ok((port, handle))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::Client;
    use secp256k1::ecdsa::Signature;
    use secp256k1::hashes::sha256::Hash;
    use secp256k1::{generate_keypair, rand, Message, SECP256K1};
    use std::str::FromStr;

    const WAGER: Wei = 10_000_000_000_000_000;

    fn get_test_access() -> AccessRequest {
        AccessRequest {
            user: UserPubKey::from_str("023d51452445aa81ecc3cfcb82dbfe937707db5c89f9f9d21d64835158df405d8c").unwrap(),
            sig: Signature::from_str("30440220208cef162c7081dafc61004daec32f5a3dadb4c6a1b4c0a479056a4962288d47022069022bc92673f73e9843cea14fa0cc46efa1b1e150339b603444c63035de21ee").unwrap(),
            challenge: "iT1HqC3oaoGjbSZEjAwpGZiCbzjtyz".to_string()
        }
    }
    async fn start(test: bool) -> Client {
        let mut settings = Settings::load(
            "does-not-exist",
            Overrides {
                port: Some(0),
                test,
                ..Default::default()
            },
        )
        .unwrap();
        settings.resolve_delay_secs = 0;
        settings.upkeep_interval_secs = 0;
        let (port, _) = run_server(settings).await.unwrap();
        Client::new("http://127.0.0.1:".to_string() + port.to_string().as_str())
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let client = start(true).await;
        let game = client
            .get_game_id(GameIdRequest {
                sport: Sport::Basketball,
                external_id: 1,
            })
            .await
            .unwrap();
        assert_eq!(
            game.to_string(),
            "0x0000000000000000000000000000000100000000000000000000000000000001"
        );
        let err = client.get_game(GameRequest { game }).await.unwrap_err();
        assert!(err.to_string().starts_with("404"));
        assert!(client.get_active_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all() {
        let client = start(true).await;
        let access = get_test_access();
        let (_, home) = generate_keypair(&mut rand::thread_rng());
        let (_, away) = generate_keypair(&mut rand::thread_rng());

        let request = RegisterAndPredictRequest {
            user: home,
            sport: Sport::Soccer,
            external_id: 1035037,
            timestamp: Utc::now() + chrono::Duration::seconds(3),
            result: GameResult::Home,
            amount: WAGER,
        };
        let registered = client
            .register_and_predict(request.clone(), access.clone())
            .await
            .unwrap();
        assert_eq!(registered.index, 0);
        let game = registered.game;
        let err = client
            .register_and_predict(request, access.clone())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("409"));
        let request = PredictRequest {
            user: away,
            game,
            result: GameResult::Away,
            amount: WAGER,
        };
        client.predict(request, access.clone()).await.unwrap();
        assert_eq!(
            client
                .calculate_winnings(CalculateWinningsRequest {
                    game,
                    wager: WAGER,
                    result: GameResult::Home
                })
                .await
                .unwrap(),
            2 * WAGER
        );
        assert_eq!(client.get_active_games().await.unwrap(), vec![game]);
        assert!(!client.check_upkeep().await.unwrap().upkeep_needed);

        tokio::time::sleep(std::time::Duration::from_secs(4)).await;
        let upkeep = client.check_upkeep().await.unwrap();
        assert_eq!(upkeep.game, Some(game));
        let request = client
            .perform_upkeep(PerformUpkeepRequest { game })
            .await
            .unwrap();
        let fulfillment = Fulfillment {
            request,
            outcome: Ok(GameResult::Home.to_word().to_vec()),
        };
        assert_eq!(
            client
                .fulfill_result(fulfillment, access.clone())
                .await
                .unwrap(),
            Some(GameResult::Home)
        );
        let stored = client.get_game(GameRequest { game }).await.unwrap();
        assert!(stored.resolved);
        assert_eq!(stored.result, GameResult::Home);
        assert!(client.get_active_games().await.unwrap().is_empty());
        assert!(client
            .is_prediction_correct(PredictionCorrectRequest {
                user: home,
                game,
                index: 0
            })
            .await
            .unwrap());

        let claim = ClaimRequest {
            user: home,
            game,
            cross_domain: false,
        };
        let receipt = client.claim(claim.clone(), access.clone()).await.unwrap();
        assert_eq!(receipt.amount, 2 * WAGER);
        assert!(client.claim(claim, access.clone()).await.is_err());
        let claim = ClaimRequest {
            user: away,
            game,
            cross_domain: true,
        };
        let err = client.claim(claim, access.clone()).await.unwrap_err();
        assert!(err.to_string().starts_with("409"));
        assert_eq!(client.get_past_predictions(UserRequest { user: away }).await.unwrap().len(), 1);
        assert!(client
            .get_active_predictions(UserRequest { user: away })
            .await
            .unwrap()
            .is_empty());

        assert_eq!(client.get_destination_receiver().await.unwrap(), None);
        client
            .set_destination_receiver(Address([7; 20]), access)
            .await
            .unwrap();
        assert_eq!(
            client.get_destination_receiver().await.unwrap(),
            Some(Address([7; 20]))
        );
    }

    #[tokio::test]
    async fn login() {
        let client = start(false).await;
        let (secret, user) = generate_keypair(&mut rand::thread_rng());
        let challenge = client.create_login_challenge(user).await.unwrap();
        let sig = SECP256K1.sign_ecdsa(
            &Message::from_hashed_data::<Hash>(challenge.as_bytes()),
            &secret,
        );
        client
            .try_login(LoginRequest {
                user,
                challenge: challenge.clone(),
                sig,
            })
            .await
            .unwrap();
        let access = AccessRequest {
            user,
            challenge,
            sig,
        };
        let login = client.check_login(access.clone()).await.unwrap();
        assert_eq!(login.role, UserRole::User);
        let err = client
            .set_destination_receiver(Address([1; 20]), access)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("401"));
        assert_eq!(client.get_destination_receiver().await.unwrap(), None);
        assert!(client.check_login(get_test_access()).await.is_err());
    }
}
