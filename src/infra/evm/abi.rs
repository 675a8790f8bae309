// Solidity ABI encoding for the handful of types the product registry uses.

use primitive_types::{H160, H256, U256};
use thiserror::Error;

const WORD: usize = 32;

// Error(string) selector
const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(H160),
    Uint(U256),
    Bool(bool),
    FixedBytes32(H256),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    Bool,
    FixedBytes32,
    String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("ABI data too short: need {needed} bytes, have {available}")]
    OutOfBounds { needed: usize, available: usize },
    #[error("ABI word is not a valid {0}")]
    InvalidValue(&'static str),
    #[error("ABI string is not valid UTF-8")]
    InvalidUtf8,
    #[error("ABI call data does not start with the expected selector")]
    SelectorMismatch,
}

impl Token {
    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_address(self) -> Option<H160> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_fixed_bytes(self) -> Option<H256> {
        match self {
            Token::FixedBytes32(h) => Some(h),
            _ => None,
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn static_word(token: &Token) -> [u8; WORD] {
    match token {
        Token::Address(a) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            word
        }
        Token::Uint(v) => uint_word(*v),
        Token::Bool(b) => uint_word(U256::from(u8::from(*b))),
        Token::FixedBytes32(h) => h.to_fixed_bytes(),
        Token::String(_) => [0u8; WORD],
    }
}

/// Encodes `tokens` as a tuple (head words followed by the dynamic tail).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            if let Token::String(s) = token {
                let bytes = s.as_bytes();
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::InvalidValue("offset"))?;
    data.get(offset..end).ok_or(AbiError::OutOfBounds {
        needed: end,
        available: data.len(),
    })
}

fn word_to_usize(word: &[u8], what: &'static str) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(word);
    if value.bits() > 64 {
        return Err(AbiError::InvalidValue(what));
    }
    usize::try_from(value.low_u64()).map_err(|_| AbiError::InvalidValue(what))
}

fn decode_one(kind: ParamType, data: &[u8], head_offset: usize) -> Result<Token, AbiError> {
    let word = word_at(data, head_offset)?;
    match kind {
        ParamType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidValue("address"));
            }
            Ok(Token::Address(H160::from_slice(&word[12..])))
        }
        ParamType::Uint => Ok(Token::Uint(U256::from_big_endian(word))),
        ParamType::Bool => match U256::from_big_endian(word) {
            v if v.is_zero() => Ok(Token::Bool(false)),
            v if v == U256::one() => Ok(Token::Bool(true)),
            _ => Err(AbiError::InvalidValue("bool")),
        },
        ParamType::FixedBytes32 => Ok(Token::FixedBytes32(H256::from_slice(word))),
        ParamType::String => {
            let offset = word_to_usize(word, "string offset")?;
            let len = word_to_usize(word_at(data, offset)?, "string length")?;
            let start = offset + WORD;
            let end = start.checked_add(len).ok_or(AbiError::InvalidValue("string length"))?;
            let bytes = data.get(start..end).ok_or(AbiError::OutOfBounds {
                needed: end,
                available: data.len(),
            })?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|_| AbiError::InvalidUtf8)
        }
    }
}

/// Decodes a tuple of `types` from return data.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_one(*kind, data, i * WORD))
        .collect()
}

/// Decodes call data that must begin with `selector`.
pub fn decode_call(
    selector: [u8; 4],
    types: &[ParamType],
    data: &[u8],
) -> Result<Vec<Token>, AbiError> {
    if data.len() < 4 || data[..4] != selector {
        return Err(AbiError::SelectorMismatch);
    }
    decode(types, &data[4..])
}

/// Extracts the message of a Solidity `Error(string)` revert, if that is what `data` holds.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    decode_call(REVERT_SELECTOR, &[ParamType::String], data)
        .ok()?
        .pop()?
        .into_string()
}

/// Encodes a revert reason the way Solidity does for `require(cond, "reason")`.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    encode_call(REVERT_SELECTOR, &[Token::String(reason.to_string())])
}
