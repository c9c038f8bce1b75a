use std::{fmt::Display, ops::Deref, str::FromStr};

use phonenumber::{Mode, PhoneNumber};
use serde::{Deserialize, Serialize};

/// A voter's phone number, stored and sent in E.164 form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone {
    inner: PhoneNumber,
}

impl Deref for Phone {
    type Target = PhoneNumber;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.format().mode(Mode::E164))
    }
}

impl FromStr for Phone {
    type Err = phonenumber::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Phone {
            inner: phonenumber::parse(None, s.trim())?,
        })
    }
}

impl TryFrom<String> for Phone {
    type Error = phonenumber::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.to_string()
    }
}
