use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use anyhow::{anyhow, bail};
use secp256k1::hashes::{hash160, Hash};

use super::*;

impl TryFrom<u8> for Sport {
    type Error = PoolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Basketball),
            2 => Ok(Self::Baseball),
            3 => Ok(Self::Hockey),
            4 => Ok(Self::Rugby),
            5 => Ok(Self::Soccer),
            e => Err(PoolError::UnsupportedSport(e)),
        }
    }
}
impl From<Sport> for u8 {
    fn from(sport: Sport) -> Self {
        sport as u8
    }
}
impl Display for Sport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Basketball => "Basketball",
            Self::Baseball => "Baseball",
            Self::Hockey => "Hockey",
            Self::Rugby => "Rugby",
            Self::Soccer => "Soccer",
        };
        write!(f, "{}", output)
    }
}

impl TryFrom<u8> for GameResult {
    type Error = PoolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Home),
            2 => Ok(Self::Away),
            _ => Err(PoolError::MalformedResult),
        }
    }
}
impl From<GameResult> for u8 {
    fn from(result: GameResult) -> Self {
        result as u8
    }
}
impl GameResult {
    /// Decodes the 32 byte big endian word an oracle answers with.
    pub fn from_word(word: &[u8]) -> Result<Self, PoolError> {
        if word.len() != 32 || word[..31].iter().any(|b| *b != 0) {
            return Err(PoolError::MalformedResult);
        }
        Self::try_from(word[31])
    }
    pub fn to_word(self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[31] = self as u8;
        word
    }
}
impl Display for GameResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::None => "None",
            Self::Home => "Home",
            Self::Away => "Away",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for GameResult {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "0" => Ok(Self::None),
            "home" | "1" => Ok(Self::Home),
            "away" | "2" => Ok(Self::Away),
            e => bail!("Couldn't deserialize to GameResult: {}", e),
        }
    }
}

impl GameId {
    pub fn new(sport: Sport, external_id: u128) -> Self {
        Self { sport, external_id }
    }
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[15] = self.sport as u8;
        word[16..].copy_from_slice(&self.external_id.to_be_bytes());
        word
    }
    pub fn from_word(word: &[u8]) -> Result<Self, PoolError> {
        if word.len() != 32 || word[..15].iter().any(|b| *b != 0) {
            return Err(PoolError::MalformedResult);
        }
        let sport = Sport::try_from(word[15])?;
        let mut external_id = [0u8; 16];
        external_id.copy_from_slice(&word[16..]);
        Ok(Self::new(sport, u128::from_be_bytes(external_id)))
    }
}
impl Display for GameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_word()))
    }
}
impl FromStr for GameId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = hex::decode(s.trim_start_matches("0x"))?;
        Ok(Self::from_word(&word)?)
    }
}
impl TryFrom<String> for GameId {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(s.as_str())
    }
}
impl From<GameId> for String {
    fn from(id: GameId) -> Self {
        id.to_string()
    }
}

impl Address {
    pub fn of(user: &UserPubKey) -> Self {
        Self(hash160::Hash::hash(&user.serialize()).to_byte_array())
    }
    /// `abi.encode(address)`: the address left padded to one 32 byte word.
    pub fn abi_encode(&self) -> Vec<u8> {
        let mut word = vec![0u8; 12];
        word.extend_from_slice(&self.0);
        word
    }
}
impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
impl FromStr for Address {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        let address: [u8; 20] = bytes
            .try_into()
            .map_err(|_| anyhow!("Address {} has to be 20 bytes long", s))?;
        Ok(Self(address))
    }
}
impl TryFrom<String> for Address {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(s.as_str())
    }
}
impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl Game {
    pub fn id(&self) -> GameId {
        GameId::new(self.sport, self.external_id)
    }
    pub fn resolved(&self) -> bool {
        matches!(self.state, GameState::Resolved(_))
    }
    /// `None` until the game is resolved.
    pub fn result(&self) -> GameResult {
        match self.state {
            GameState::Resolved(result) => result,
            _ => GameResult::None,
        }
    }
    pub fn pool(&self, side: GameResult) -> Wei {
        match side {
            GameResult::Home => self.home_wager_amount,
            GameResult::Away => self.away_wager_amount,
            GameResult::None => 0,
        }
    }
    pub fn total_pool(&self) -> Result<Wei, PoolError> {
        self.home_wager_amount
            .checked_add(self.away_wager_amount)
            .ok_or(PoolError::AmountOverflow)
    }
}

impl Display for GameState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Active => "Active",
            Self::AwaitingResult { .. } => "AwaitingResult",
            Self::Resolved(_) => "Resolved",
        };
        write!(f, "{}", output)
    }
}
impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::User => "User",
            Self::Admin => "Admin",
            Self::Root => "Root",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Admin" => Ok(Self::Admin),
            "Root" => Ok(Self::Root),
            e => bail!("Couldn't deserialize to UserRole: {}", e),
        }
    }
}
impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use secp256k1::{generate_keypair, rand};

    #[test]
    fn game_id_matches_word_layout() {
        let id = GameId::new(Sport::Basketball, 1);
        let word = id.to_word();
        assert_eq!(word[15], 1);
        assert_eq!(word[31], 1);
        assert_eq!(
            id.to_string(),
            "0x0000000000000000000000000000000100000000000000000000000000000001"
        );
        assert_eq!(GameId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn game_id_rejects_unknown_sport() {
        let mut word = GameId::new(Sport::Soccer, 7).to_word();
        word[15] = 9;
        assert_eq!(
            GameId::from_word(&word),
            Err(PoolError::UnsupportedSport(9))
        );
    }

    #[test]
    fn result_word_decoding() {
        assert_eq!(
            GameResult::from_word(&GameResult::Away.to_word()),
            Ok(GameResult::Away)
        );
        assert_eq!(
            GameResult::from_word(&[0u8; 32]),
            Ok(GameResult::None)
        );
        let mut word = [0u8; 32];
        word[31] = 3;
        assert_eq!(GameResult::from_word(&word), Err(PoolError::MalformedResult));
        word[31] = 1;
        word[0] = 1;
        assert_eq!(GameResult::from_word(&word), Err(PoolError::MalformedResult));
        assert_eq!(GameResult::from_word(&[1]), Err(PoolError::MalformedResult));
    }

    #[test]
    fn address_is_abi_encoded_as_one_word() {
        let (_, user) = generate_keypair(&mut rand::thread_rng());
        let address = Address::of(&user);
        let encoded = address.abi_encode();
        assert_eq!(encoded.len(), 32);
        assert!(encoded[..12].iter().all(|b| *b == 0));
        assert_eq!(&encoded[12..], &address.0);
        assert_eq!(Address::from_str(&address.to_string()).unwrap(), address);
    }
}
