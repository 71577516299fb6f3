use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::api::{GameResult, Sport};

/// Thin client for the api-sports family of APIs, one host per sport.
#[derive(Debug, Clone)]
pub struct SportsApiClient {
    client: Client,
    api_key: String,
    base_url: Option<String>,
}

impl SportsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: None,
        }
    }
    /// Sends every sport to the same host, for proxies and local mocks.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }
    fn base_url(&self, sport: Sport) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }
        match sport {
            Sport::Basketball => "https://v1.basketball.api-sports.io",
            Sport::Baseball => "https://v1.baseball.api-sports.io",
            Sport::Hockey => "https://v1.hockey.api-sports.io",
            Sport::Rugby => "https://v1.rugby.api-sports.io",
            Sport::Soccer => "https://v3.football.api-sports.io",
        }
        .to_string()
    }
    fn games_path(sport: Sport) -> &'static str {
        match sport {
            Sport::Soccer => "/fixtures",
            _ => "/games",
        }
    }
    /// Fetches the raw game object for `external_id`.
    pub async fn get_game(&self, sport: Sport, external_id: u128) -> Result<Value> {
        if self.api_key.is_empty() {
            bail!("No api-sports key configured")
        }
        if external_id == 0 {
            bail!("Invalid game id {}", external_id)
        }
        let url = format!(
            "{}{}?id={}",
            self.base_url(sport),
            Self::games_path(sport),
            external_id
        );
        let response = self
            .client
            .get(url)
            .header("x-apisports-key", self.api_key.as_str())
            .send()
            .await
            .with_context(|| format!("couldn't reach api-sports for {}", sport))?;
        if response.status() != StatusCode::OK {
            bail!("Status {}", response.status())
        }
        let data = response.json::<Value>().await?;
        if has_errors(&data["errors"]) {
            bail!("API error: {}", data["errors"])
        }
        if data["results"].as_u64() == Some(0) {
            bail!("Game {} not found", external_id)
        }
        data["response"]
            .get(0)
            .cloned()
            .ok_or(anyhow!("Game {} not found", external_id))
    }
    pub async fn get_game_result(&self, sport: Sport, external_id: u128) -> Result<GameResult> {
        let game = self.get_game(sport, external_id).await?;
        game_result_from_response(sport, &game)
    }
}

// api-sports reports errors as an empty list when there are none and as an
// object keyed by field otherwise.
fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Array(errors) => !errors.is_empty(),
        Value::Object(errors) => !errors.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// Derives the result of a finished game from its api-sports representation.
pub fn game_result_from_response(sport: Sport, game: &Value) -> Result<GameResult> {
    let status = match sport {
        Sport::Soccer => &game["fixture"]["status"]["short"],
        _ => &game["status"]["short"],
    }
    .as_str()
    .ok_or(anyhow!("Game has no status"))?;
    match status {
        "POST" | "CANC" | "INTR" | "ABD" => return Ok(GameResult::None),
        "FT" => {}
        _ => bail!("Game not finished"),
    }
    let score = |value: &Value| -> Result<i64> {
        value
            .as_i64()
            .ok_or(anyhow!("Game has no final score for {}", sport))
    };
    match sport {
        Sport::Basketball | Sport::Baseball => {
            let home = score(&game["scores"]["home"]["total"])?;
            let away = score(&game["scores"]["away"]["total"])?;
            Ok(if home > away {
                GameResult::Home
            } else {
                GameResult::Away
            })
        }
        Sport::Hockey | Sport::Rugby => Ok(compare(
            score(&game["scores"]["home"])?,
            score(&game["scores"]["away"])?,
        )),
        Sport::Soccer => Ok(compare(
            score(&game["goals"]["home"])?,
            score(&game["goals"]["away"])?,
        )),
    }
}
fn compare(home: i64, away: i64) -> GameResult {
    match home.cmp(&away) {
        std::cmp::Ordering::Greater => GameResult::Home,
        std::cmp::Ordering::Less => GameResult::Away,
        std::cmp::Ordering::Equal => GameResult::None,
    }
}

/// Serves `body` with `status` on every games endpoint of a local server
/// and returns a client pointed at it.
#[cfg(test)]
pub(crate) async fn mock_api(status: StatusCode, body: Value) -> SportsApiClient {
    use axum::{http::HeaderMap, routing::get, Json, Router};

    let handler = move |headers: HeaderMap| {
        let body = body.clone();
        async move {
            if headers.get("x-apisports-key").is_none() {
                return (StatusCode::UNAUTHORIZED, Json(Value::Null));
            }
            (status, Json(body))
        }
    };
    let app = Router::new()
        .route("/games", get(handler.clone()))
        .route("/fixtures", get(handler));
    let server = axum::Server::bind(&([127, 0, 0, 1], 0).into()).serve(app.into_make_service());
    let url = format!("http://{}", server.local_addr());
    tokio::spawn(server);
    SportsApiClient::new("key".to_string()).with_base_url(url)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn http_failures_are_errors() {
        let client = mock_api(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
        let err = client.get_game(Sport::Soccer, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "Status 500 Internal Server Error");

        let client = mock_api(
            StatusCode::OK,
            json!({"errors": {"token": "Error/Missing application key."}, "results": 0, "response": []}),
        )
        .await;
        let err = client.get_game(Sport::Hockey, 1).await.unwrap_err();
        assert!(err.to_string().starts_with("API error"));

        let client = mock_api(
            StatusCode::OK,
            json!({"errors": [], "results": 0, "response": []}),
        )
        .await;
        let err = client.get_game(Sport::Rugby, 2).await.unwrap_err();
        assert_eq!(err.to_string(), "Game 2 not found");

        let client = mock_api(
            StatusCode::OK,
            json!({"errors": [], "results": 1, "response": []}),
        )
        .await;
        let err = client.get_game(Sport::Baseball, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "Game 3 not found");

        let client = SportsApiClient::new(String::new());
        assert!(client.get_game(Sport::Soccer, 1).await.is_err());
    }

    #[tokio::test]
    async fn finished_game_is_fetched() {
        let client = mock_api(
            StatusCode::OK,
            json!({
                "errors": [],
                "results": 1,
                "response": [{
                    "fixture": {"id": 1035037, "status": {"short": "FT"}},
                    "goals": {"home": 0, "away": 3}
                }]
            }),
        )
        .await;
        assert_eq!(
            client.get_game_result(Sport::Soccer, 1035037).await.unwrap(),
            GameResult::Away
        );
        assert!(client.get_game(Sport::Soccer, 0).await.is_err());
    }

    #[test]
    fn soccer_uses_fixture_status_and_goals() {
        let game = json!({
            "fixture": {"id": 1035037, "status": {"short": "FT"}},
            "goals": {"home": 2, "away": 1}
        });
        assert_eq!(
            game_result_from_response(Sport::Soccer, &game).unwrap(),
            GameResult::Home
        );
        let draw = json!({
            "fixture": {"status": {"short": "FT"}},
            "goals": {"home": 0, "away": 0}
        });
        assert_eq!(
            game_result_from_response(Sport::Soccer, &draw).unwrap(),
            GameResult::None
        );
    }
    #[test]
    fn basketball_ties_go_away() {
        let game = json!({
            "status": {"short": "FT"},
            "scores": {"home": {"total": 101}, "away": {"total": 101}}
        });
        assert_eq!(
            game_result_from_response(Sport::Basketball, &game).unwrap(),
            GameResult::Away
        );
        let game = json!({
            "status": {"short": "FT"},
            "scores": {"home": {"total": 99}, "away": {"total": 87}}
        });
        assert_eq!(
            game_result_from_response(Sport::Baseball, &game).unwrap(),
            GameResult::Home
        );
    }
    #[test]
    fn hockey_compares_plain_scores() {
        let game = json!({
            "status": {"short": "FT"},
            "scores": {"home": 1, "away": 4}
        });
        assert_eq!(
            game_result_from_response(Sport::Hockey, &game).unwrap(),
            GameResult::Away
        );
        let game = json!({
            "status": {"short": "FT"},
            "scores": {"home": 12, "away": 12}
        });
        assert_eq!(
            game_result_from_response(Sport::Rugby, &game).unwrap(),
            GameResult::None
        );
    }
    #[test]
    fn cancelled_games_are_void() {
        for status in ["POST", "CANC", "INTR", "ABD"] {
            let game = json!({"status": {"short": status}});
            assert_eq!(
                game_result_from_response(Sport::Hockey, &game).unwrap(),
                GameResult::None
            );
        }
    }
    #[test]
    fn unfinished_games_are_errors() {
        let game = json!({"fixture": {"status": {"short": "2H"}}});
        let err = game_result_from_response(Sport::Soccer, &game).unwrap_err();
        assert_eq!(err.to_string(), "Game not finished");
        let game = json!({"status": {"short": "FT"}, "scores": {}});
        assert!(game_result_from_response(Sport::Basketball, &game).is_err());
    }
    #[test]
    fn error_shapes() {
        assert!(!has_errors(&json!([])));
        assert!(!has_errors(&json!({})));
        assert!(has_errors(&json!({"token": "Error/Missing application key."})));
    }
}
