#![allow(dead_code)]
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use api::*;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secp256k1::{
    ecdsa::Signature, generate_keypair, hashes::sha256::Hash, rand, Message, SecretKey,
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

use crate::client::Client;

mod api;
mod client;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    url: String,
}
#[derive(Subcommand)]
enum Commands {
    GenerateKeys,
    Login,
    SignEcdsa {
        #[arg(short, long)]
        message: String,
    },
    /// Register a game with the first prediction on it
    RegisterAndPredict {
        #[arg(short, long)]
        sport: u8,
        #[arg(short, long)]
        external_id: u128,
        /// Scheduled start, RFC 3339
        #[arg(short, long)]
        timestamp: DateTime<Utc>,
        #[arg(short, long)]
        result: GameResult,
        /// Stake in ether
        #[arg(short, long)]
        amount: String,
    },
    Predict {
        #[arg(short, long)]
        game: GameId,
        #[arg(short, long)]
        result: GameResult,
        /// Stake in ether
        #[arg(short, long)]
        amount: String,
    },
    Claim {
        #[arg(short, long)]
        game: GameId,
        #[arg(short, long)]
        cross_domain: bool,
    },
    GetGameId {
        #[arg(short, long)]
        sport: u8,
        #[arg(short, long)]
        external_id: u128,
    },
    GetGame {
        #[arg(short, long)]
        game: GameId,
    },
    GetActiveGames,
    GetPredictions {
        #[arg(short, long)]
        user: Option<UserPubKey>,
    },
    IsPredictionCorrect {
        #[arg(short, long)]
        game: GameId,
        #[arg(short, long)]
        index: u32,
        #[arg(short, long)]
        user: Option<UserPubKey>,
    },
    CalculateWinnings {
        #[arg(short, long)]
        game: GameId,
        /// Wager in ether
        #[arg(short, long)]
        wager: String,
        #[arg(short, long)]
        result: GameResult,
    },
    CheckUpkeep,
    PerformUpkeep {
        #[arg(short, long)]
        game: GameId,
    },
    SetDestinationReceiver {
        #[arg(short, long)]
        address: Address,
    },
    GetDestinationReceiver,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Args::parse();
    let client = Client::new(cli.url);

    match cli.command {
        Commands::GenerateKeys => {
            let keys = generate_keypair(&mut rand::thread_rng());
            println!("Pubkey: {}", keys.1);
            println!("Address: {}", Address::of(&keys.1));
            let mut private = File::create("ecdsa.key").await?;
            let mut public = File::create("ecdsa.pub").await?;
            private
                .write_all(format!("{}", keys.0.display_secret()).as_bytes())
                .await?;
            public.write_all(keys.1.to_string().as_bytes()).await?;
        }
        Commands::Login => {
            let secret_key = read_secret().await?;
            let user = UserPubKey::from_secret_key_global(&secret_key);
            let challenge = client.create_login_challenge(user).await?;
            let message = Message::from_hashed_data::<Hash>(challenge.as_bytes());
            let signature = secret_key.sign_ecdsa(message);
            let mut file = File::create("access_token").await?;
            file.write_all(signature.to_string().as_bytes()).await?;
            let mut file = File::create("challenge").await?;
            file.write_all(challenge.as_bytes()).await?;
            println!("Signed Challenge \"{}\"", challenge);
            let request = LoginRequest {
                user,
                challenge,
                sig: signature,
            };
            client.try_login(request).await?;
            println!("Logged in as {}", user);
        }
        Commands::SignEcdsa { message } => {
            let message = Message::from_hashed_data::<Hash>(message.as_bytes());
            let secret_key = read_secret().await?;
            let signature = secret_key.sign_ecdsa(message);
            println!("{}", signature);
        }
        Commands::RegisterAndPredict {
            sport,
            external_id,
            timestamp,
            result,
            amount,
        } => {
            let access = get_access().await?;
            let request = RegisterAndPredictRequest {
                user: access.user,
                sport: Sport::try_from(sport)?,
                external_id,
                timestamp,
                result,
                amount: parse_ether(amount.as_str())?,
            };
            let response = client.register_and_predict(request, access).await?;
            println!(
                "Registered game {}, prediction {}",
                response.game, response.index
            );
        }
        Commands::Predict {
            game,
            result,
            amount,
        } => {
            let access = get_access().await?;
            let request = PredictRequest {
                user: access.user,
                game,
                result,
                amount: parse_ether(amount.as_str())?,
            };
            let response = client.predict(request, access).await?;
            println!("Prediction {} on game {}", response.index, response.game);
        }
        Commands::Claim { game, cross_domain } => {
            let access = get_access().await?;
            let request = ClaimRequest {
                user: access.user,
                game,
                cross_domain,
            };
            let receipt = client.claim(request, access).await?;
            println!("Claimed {} ETH", format_ether(receipt.amount));
            if let Some(message) = receipt.transfer_request {
                println!("Transfer request: {}", message);
            }
        }
        Commands::GetGameId { sport, external_id } => {
            let request = GameIdRequest {
                sport: Sport::try_from(sport)?,
                external_id,
            };
            println!("{}", client.get_game_id(request).await?);
        }
        Commands::GetGame { game } => {
            let game = client.get_game(GameRequest { game }).await?;
            println!("{:#?}", game);
            println!(
                "Home: {} ETH | Away: {} ETH",
                format_ether(game.home_wager_amount),
                format_ether(game.away_wager_amount)
            );
        }
        Commands::GetActiveGames => {
            for game in client.get_active_games().await? {
                println!("{}", game);
            }
        }
        Commands::GetPredictions { user } => {
            let user = match user {
                Some(user) => user,
                None => read_public().await?,
            };
            let active = client
                .get_active_predictions(UserRequest { user })
                .await?;
            println!("Active: {:#?}", active);
            let past = client.get_past_predictions(UserRequest { user }).await?;
            println!("Past: {:#?}", past);
        }
        Commands::IsPredictionCorrect { game, index, user } => {
            let user = match user {
                Some(user) => user,
                None => read_public().await?,
            };
            let request = PredictionCorrectRequest { user, game, index };
            println!("{}", client.is_prediction_correct(request).await?);
        }
        Commands::CalculateWinnings {
            game,
            wager,
            result,
        } => {
            let request = CalculateWinningsRequest {
                game,
                wager: parse_ether(wager.as_str())?,
                result,
            };
            let winnings = client.calculate_winnings(request).await?;
            println!("{} ETH", format_ether(winnings));
        }
        Commands::CheckUpkeep => {
            let upkeep = client.check_upkeep().await?;
            match upkeep.game {
                Some(game) => println!("Game {} is due", game),
                None => println!("No game is due"),
            }
        }
        Commands::PerformUpkeep { game } => {
            let request = client
                .perform_upkeep(PerformUpkeepRequest { game })
                .await?;
            println!("Result request {}", request);
        }
        Commands::SetDestinationReceiver { address } => {
            client
                .set_destination_receiver(address, get_access().await?)
                .await?;
        }
        Commands::GetDestinationReceiver => match client.get_destination_receiver().await? {
            Some(receiver) => println!("{}", receiver),
            None => println!("No destination receiver set"),
        },
    }
    Ok(())
}
fn parse_ether(ether: &str) -> Result<Wei> {
    let ether = Decimal::from_str(ether)?;
    let wei = ether
        .checked_mul(Decimal::from(WEI_PER_ETHER))
        .ok_or(anyhow!("{} ETH is too large", ether))?;
    if wei.is_sign_negative() || !wei.fract().is_zero() {
        bail!("{} ETH is not a whole number of wei", ether)
    }
    wei.to_u128().ok_or(anyhow!("{} ETH is out of range", ether))
}
fn format_ether(wei: Wei) -> String {
    i128::try_from(wei)
        .ok()
        .and_then(|wei| Decimal::try_from_i128_with_scale(wei, 18).ok())
        .map(|ether| ether.normalize().to_string())
        .unwrap_or_else(|| format!("{}e-18", wei))
}
async fn get_access() -> Result<AccessRequest> {
    let user = read_public().await?;
    let sig = read_token().await?;
    let challenge = read_challenge().await?;
    Ok(AccessRequest {
        user,
        sig,
        challenge,
    })
}
async fn read_file(path: &str) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut contents = vec![];
    file.read_to_end(&mut contents).await?;
    Ok(String::from_utf8(contents)?)
}
async fn read_secret() -> Result<SecretKey> {
    Ok(SecretKey::from_str(read_file("ecdsa.key").await?.as_str())?)
}
async fn read_public() -> Result<UserPubKey> {
    Ok(UserPubKey::from_str(read_file("ecdsa.pub").await?.as_str())?)
}
async fn read_token() -> Result<Signature> {
    Ok(Signature::from_str(read_file("access_token").await?.as_str())?)
}
async fn read_challenge() -> Result<String> {
    read_file("challenge").await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ether_amounts() {
        assert_eq!(parse_ether("0.01").unwrap(), 10_000_000_000_000_000);
        assert_eq!(parse_ether("0.00001").unwrap(), 10_000_000_000_000);
        assert_eq!(parse_ether("1").unwrap(), 1_000_000_000_000_000_000);
        assert!(parse_ether("-1").is_err());
        assert!(parse_ether("0.0000000000000000001").is_err());
        assert_eq!(format_ether(20_000_000_000_000_000), "0.02");
    }
}
