//! Solidity ABI codec for the Earth Click contract.
//!
//! Hand-rolled for the six entry points we bind. Encoding follows the
//! standard head/tail layout: 32-byte words, dynamic values referenced by
//! byte offsets from the start of the argument block. Decoding is
//! bounds-checked everywhere; malformed return data is an [`AbiError`],
//! never a panic.

use alloy_primitives::{keccak256, Address, U256};

use crate::error::AbiError;
use crate::types::{CountryAggregate, CountryScore, PlayerStanding, UserRecord};

const WORD: usize = 32;

/// First four bytes of keccak-256 over the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

enum Token {
    Word([u8; WORD]),
    Dynamic(Vec<u8>),
}

/// Builds calldata for one contract call.
struct CallEncoder {
    selector: [u8; 4],
    tokens: Vec<Token>,
}

impl CallEncoder {
    fn new(signature: &str) -> Self {
        Self {
            selector: selector(signature),
            tokens: Vec::new(),
        }
    }

    fn push_uint(mut self, value: U256) -> Self {
        self.tokens.push(Token::Word(value.to_be_bytes::<WORD>()));
        self
    }

    fn push_address(mut self, address: Address) -> Self {
        let mut word = [0u8; WORD];
        word[12..].copy_from_slice(address.as_slice());
        self.tokens.push(Token::Word(word));
        self
    }

    fn push_string(mut self, value: &str) -> Self {
        let bytes = value.as_bytes();
        let mut block = Vec::with_capacity(WORD + padded_len(bytes.len()));
        block.extend_from_slice(&U256::from(bytes.len()).to_be_bytes::<WORD>());
        block.extend_from_slice(bytes);
        block.resize(WORD + padded_len(bytes.len()), 0);
        self.tokens.push(Token::Dynamic(block));
        self
    }

    fn finish(self) -> Vec<u8> {
        let head_len = self.tokens.len() * WORD;
        let mut head = Vec::with_capacity(head_len);
        let mut tail = Vec::new();
        for token in &self.tokens {
            match token {
                Token::Word(word) => head.extend_from_slice(word),
                Token::Dynamic(block) => {
                    let offset = U256::from(head_len + tail.len());
                    head.extend_from_slice(&offset.to_be_bytes::<WORD>());
                    tail.extend_from_slice(block);
                }
            }
        }
        let mut out = Vec::with_capacity(4 + head_len + tail.len());
        out.extend_from_slice(&self.selector);
        out.extend_from_slice(&head);
        out.extend_from_slice(&tail);
        out
    }
}

/// Bounds-checked reader over ABI return data.
struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, index: usize) -> Result<&'a [u8], AbiError> {
        let start = index * WORD;
        let end = start + WORD;
        if end > self.data.len() {
            return Err(AbiError::Truncated {
                need: end,
                have: self.data.len(),
            });
        }
        Ok(&self.data[start..end])
    }

    fn uint(&self, index: usize) -> Result<U256, AbiError> {
        Ok(U256::from_be_slice(self.word(index)?))
    }

    /// Reads a head word as a byte offset into this decoder's data.
    fn offset(&self, index: usize) -> Result<usize, AbiError> {
        let value = self.uint(index)?;
        let offset = usize::try_from(value).map_err(|_| AbiError::BadOffset(usize::MAX))?;
        if offset % WORD != 0 || offset >= self.data.len() {
            return Err(AbiError::BadOffset(offset));
        }
        Ok(offset)
    }

    fn address(&self, index: usize) -> Result<Address, AbiError> {
        Ok(Address::from_slice(&self.word(index)?[12..]))
    }

    /// Sub-decoder positioned at `offset`; used for dynamic values whose
    /// inner offsets are relative to their own data region.
    fn region(&self, offset: usize) -> Result<Decoder<'a>, AbiError> {
        if offset > self.data.len() {
            return Err(AbiError::BadOffset(offset));
        }
        Ok(Decoder::new(&self.data[offset..]))
    }

    /// Reads a word-element array length at word 0, sanity-bounded by the
    /// words that are actually present. String lengths are in bytes and go
    /// through [`Self::string_at`] instead.
    fn array_len(&self) -> Result<usize, AbiError> {
        let len = usize::try_from(self.uint(0)?).map_err(|_| AbiError::BadLength(usize::MAX))?;
        if len > self.data.len() / WORD {
            return Err(AbiError::BadLength(len));
        }
        Ok(len)
    }

    fn string_at(&self, offset: usize) -> Result<String, AbiError> {
        let region = self.region(offset)?;
        // The length word counts bytes, not words.
        let len = usize::try_from(region.uint(0)?).map_err(|_| AbiError::BadLength(usize::MAX))?;
        let end = len.checked_add(WORD).ok_or(AbiError::BadLength(len))?;
        if end > region.data.len() {
            return Err(AbiError::Truncated {
                need: end,
                have: region.data.len(),
            });
        }
        String::from_utf8(region.data[WORD..end].to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }

    fn string_array_at(&self, offset: usize) -> Result<Vec<String>, AbiError> {
        let region = self.region(offset)?;
        let len = region.array_len()?;
        // Element offsets are relative to the start of the element area,
        // which begins right after the length word.
        let elements = region.region(WORD)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(elements.string_at(elements.offset(i)?)?);
        }
        Ok(out)
    }

    fn uint_array_at(&self, offset: usize) -> Result<Vec<U256>, AbiError> {
        let region = self.region(offset)?;
        let len = region.array_len()?;
        (1..=len).map(|i| region.uint(i)).collect()
    }

    fn address_array_at(&self, offset: usize) -> Result<Vec<Address>, AbiError> {
        let region = self.region(offset)?;
        let len = region.array_len()?;
        (1..=len).map(|i| region.address(i)).collect()
    }
}

// ============ Calldata builders ============

/// `register(string,string)`
pub fn encode_register(username: &str, country: &str) -> Vec<u8> {
    CallEncoder::new("register(string,string)")
        .push_string(username)
        .push_string(country)
        .finish()
}

/// `submitPoints(uint256)`, payable: fee goes in `msg.value`.
pub fn encode_submit_points(points: U256) -> Vec<u8> {
    CallEncoder::new("submitPoints(uint256)")
        .push_uint(points)
        .finish()
}

/// `getUserInfo(address)`
pub fn encode_get_user_info(user: Address) -> Vec<u8> {
    CallEncoder::new("getUserInfo(address)")
        .push_address(user)
        .finish()
}

/// `getCountryLeaderboard(uint256)`
pub fn encode_get_country_leaderboard(limit: U256) -> Vec<u8> {
    CallEncoder::new("getCountryLeaderboard(uint256)")
        .push_uint(limit)
        .finish()
}

/// `getTopPlayersInCountry(string,uint256)`
pub fn encode_get_top_players(country: &str, limit: U256) -> Vec<u8> {
    CallEncoder::new("getTopPlayersInCountry(string,uint256)")
        .push_string(country)
        .push_uint(limit)
        .finish()
}

/// `getAllCountries()`
pub fn encode_get_all_countries() -> Vec<u8> {
    CallEncoder::new("getAllCountries()").finish()
}

// ============ Return decoders ============

/// `(string username, string country, uint256 totalPoints,
///   uint256 pendingPointsCount, uint256 lastSubmitTimestamp)`
pub fn decode_user_info(data: &[u8]) -> Result<UserRecord, AbiError> {
    let dec = Decoder::new(data);
    Ok(UserRecord {
        username: dec.string_at(dec.offset(0)?)?,
        country: dec.string_at(dec.offset(1)?)?,
        total_points: dec.uint(2)?,
        pending_points: dec.uint(3)?,
        last_submit_timestamp: dec.uint(4)?,
    })
}

/// `(string[] countryNames, uint256[] countryPoints)`
pub fn decode_country_leaderboard(data: &[u8]) -> Result<Vec<CountryScore>, AbiError> {
    let dec = Decoder::new(data);
    let names = dec.string_array_at(dec.offset(0)?)?;
    let points = dec.uint_array_at(dec.offset(1)?)?;
    if names.len() != points.len() {
        return Err(AbiError::BadLength(points.len()));
    }
    Ok(names
        .into_iter()
        .zip(points)
        .map(|(name, total_points)| CountryScore { name, total_points })
        .collect())
}

/// `(address[] playerAddresses, string[] usernames, uint256[] playerPoints)`
pub fn decode_top_players(data: &[u8]) -> Result<Vec<PlayerStanding>, AbiError> {
    let dec = Decoder::new(data);
    let addresses = dec.address_array_at(dec.offset(0)?)?;
    let usernames = dec.string_array_at(dec.offset(1)?)?;
    let points = dec.uint_array_at(dec.offset(2)?)?;
    if addresses.len() != usernames.len() || addresses.len() != points.len() {
        return Err(AbiError::BadLength(points.len()));
    }
    Ok(addresses
        .into_iter()
        .zip(usernames)
        .zip(points)
        .map(|((address, username), points)| PlayerStanding {
            address,
            username,
            points,
        })
        .collect())
}

/// `(string[] countryNames, uint256[] countryPoints, uint256[] countryPlayers)`
pub fn decode_all_countries(data: &[u8]) -> Result<Vec<CountryAggregate>, AbiError> {
    let dec = Decoder::new(data);
    let names = dec.string_array_at(dec.offset(0)?)?;
    let points = dec.uint_array_at(dec.offset(1)?)?;
    let players = dec.uint_array_at(dec.offset(2)?)?;
    if names.len() != points.len() || names.len() != players.len() {
        return Err(AbiError::BadLength(players.len()));
    }
    Ok(names
        .into_iter()
        .zip(points)
        .zip(players)
        .map(|((name, total_points), player_count)| CountryAggregate {
            name,
            total_points,
            player_count,
        })
        .collect())
}
