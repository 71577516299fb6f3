use anyhow::{bail, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::*;

pub async fn bail_if_err(response: Response, expected_code: StatusCode) -> Result<Response> {
    if response.status() != expected_code {
        bail!("{}: {}", response.status(), response.text().await?)
    }
    Ok(response)
}

pub struct Client {
    url: String,
    client: reqwest::Client,
}
impl Client {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::new();
        Self { url, client }
    }
    async fn post(
        &self,
        path: &str,
        request: &impl Serialize,
        expected_code: StatusCode,
    ) -> Result<Response> {
        let response = self
            .client
            .post(self.url.clone() + path)
            .json(request)
            .send()
            .await?;
        bail_if_err(response, expected_code).await
    }
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url.clone() + path).send().await?;
        Ok(bail_if_err(response, StatusCode::OK).await?.json::<T>().await?)
    }
    pub async fn create_login_challenge(&self, user: UserPubKey) -> Result<String> {
        let response = self
            .post("/get_login_challenge", &user, StatusCode::OK)
            .await?;
        Ok(response.text().await?)
    }
    pub async fn try_login(&self, request: LoginRequest) -> Result<()> {
        self.post("/try_login", &request, StatusCode::OK).await?;
        Ok(())
    }
    pub async fn check_login(&self, access: AccessRequest) -> Result<UserResponse> {
        let response = self.post("/check_login", &access, StatusCode::OK).await?;
        Ok(response.json::<UserResponse>().await?)
    }
    pub async fn register_and_predict(
        &self,
        data: RegisterAndPredictRequest,
        access: AccessRequest,
    ) -> Result<PredictResponse> {
        let request = PostRequest { access, data };
        let response = self
            .post("/register_and_predict", &request, StatusCode::CREATED)
            .await?;
        Ok(response.json::<PredictResponse>().await?)
    }
    pub async fn predict(
        &self,
        data: PredictRequest,
        access: AccessRequest,
    ) -> Result<PredictResponse> {
        let request = PostRequest { access, data };
        let response = self
            .post("/predict", &request, StatusCode::CREATED)
            .await?;
        Ok(response.json::<PredictResponse>().await?)
    }
    pub async fn claim(&self, data: ClaimRequest, access: AccessRequest) -> Result<ClaimReceipt> {
        let request = PostRequest { access, data };
        let response = self.post("/claim", &request, StatusCode::OK).await?;
        Ok(response.json::<ClaimReceipt>().await?)
    }
    pub async fn get_game_id(&self, request: GameIdRequest) -> Result<GameId> {
        let response = self.post("/get_game_id", &request, StatusCode::OK).await?;
        Ok(response.json::<GameId>().await?)
    }
    pub async fn get_game(&self, request: GameRequest) -> Result<GameResponse> {
        let response = self.post("/get_game", &request, StatusCode::OK).await?;
        Ok(response.json::<GameResponse>().await?)
    }
    pub async fn get_active_games(&self) -> Result<Vec<GameId>> {
        self.get("/get_active_games").await
    }
    pub async fn get_active_predictions(&self, request: UserRequest) -> Result<Vec<Prediction>> {
        let response = self
            .post("/get_active_predictions", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<Vec<Prediction>>().await?)
    }
    pub async fn get_past_predictions(&self, request: UserRequest) -> Result<Vec<Prediction>> {
        let response = self
            .post("/get_past_predictions", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<Vec<Prediction>>().await?)
    }
    pub async fn is_prediction_correct(&self, request: PredictionCorrectRequest) -> Result<bool> {
        let response = self
            .post("/is_prediction_correct", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<bool>().await?)
    }
    pub async fn calculate_winnings(&self, request: CalculateWinningsRequest) -> Result<Wei> {
        let response = self
            .post("/calculate_winnings", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<Wei>().await?)
    }
    pub async fn check_upkeep(&self) -> Result<UpkeepResponse> {
        self.get("/check_upkeep").await
    }
    pub async fn perform_upkeep(&self, request: PerformUpkeepRequest) -> Result<RequestId> {
        let response = self
            .post("/perform_upkeep", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<RequestId>().await?)
    }
    pub async fn fulfill_result(
        &self,
        data: Fulfillment,
        access: AccessRequest,
    ) -> Result<Option<GameResult>> {
        let request = PostRequest { access, data };
        let response = self
            .post("/fulfill_result", &request, StatusCode::OK)
            .await?;
        Ok(response.json::<Option<GameResult>>().await?)
    }
    pub async fn set_destination_receiver(
        &self,
        data: Address,
        access: AccessRequest,
    ) -> Result<()> {
        let request = PostRequest { access, data };
        self.post("/set_destination_receiver", &request, StatusCode::OK)
            .await?;
        Ok(())
    }
    pub async fn get_destination_receiver(&self) -> Result<Option<Address>> {
        self.get("/get_destination_receiver").await
    }
}
