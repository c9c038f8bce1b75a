use std::fmt::{Display, Formatter};
use std::str::FromStr;

use data_encoding::HEXLOWER;
use mongodb::bson::{doc, Bson, Document};
use rand::Rng;
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Random bytes in a voter token.
pub const TOKEN_BYTES: usize = 16;

/// A voter's identity: an unguessable token that doubles as their ballot link.
///
/// Tokens are random rather than sequential, so holding one ballot link
/// reveals nothing about any other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterToken(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid voter token")]
pub struct InvalidToken;

impl VoterToken {
    /// Generate a fresh random token.
    pub fn random() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill(&mut bytes);
        Self(HEXLOWER.encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filter matching the voter with this token.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self }
    }
}

impl Display for VoterToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VoterToken {
    type Err = InvalidToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match HEXLOWER.decode(s.as_bytes()) {
            Ok(bytes) if bytes.len() == TOKEN_BYTES => Ok(Self(s.to_string())),
            _ => Err(InvalidToken),
        }
    }
}

impl TryFrom<String> for VoterToken {
    type Error = InvalidToken;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VoterToken> for String {
    fn from(token: VoterToken) -> Self {
        token.0
    }
}

impl From<VoterToken> for Bson {
    fn from(token: VoterToken) -> Self {
        Bson::String(token.0)
    }
}

impl<'a> FromParam<'a> for VoterToken {
    type Error = InvalidToken;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

impl UriDisplay<Path> for VoterToken {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(&self.0)
    }
}

impl_from_uri_param_identity!([Path] VoterToken);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_tokens_are_distinct_and_valid() {
        let tokens: HashSet<_> = (0..1000).map(|_| VoterToken::random()).collect();
        assert_eq!(tokens.len(), 1000);
        for token in tokens {
            assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
            assert_eq!(token.as_str().parse::<VoterToken>(), Ok(token.clone()));
        }
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!("".parse::<VoterToken>(), Err(InvalidToken));
        assert_eq!("abc".parse::<VoterToken>(), Err(InvalidToken));
        // Right length, wrong alphabet.
        assert_eq!(
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".parse::<VoterToken>(),
            Err(InvalidToken)
        );
        // Upper case is not canonical.
        assert_eq!(
            "0123456789ABCDEF0123456789ABCDEF".parse::<VoterToken>(),
            Err(InvalidToken)
        );
    }
}
