use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A blocked user as returned by flag listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "time")]
    pub until: DateTime<Utc>,
}

/// One element of a flag listing: a blocked user record or a bare user id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlaggedUser {
    Blocked(BlockedUser),
    Verified(String),
}

/// A single user-detail field, or all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserDetail {
    Email,
    Telegram,
    All,
}

impl UserDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Telegram => "telegram",
            Self::All => "all",
        }
    }
}

impl fmt::Display for UserDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserDetail {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "telegram" => Ok(Self::Telegram),
            "all" => Ok(Self::All),
            other => Err(TypeError::UnsupportedDetail(other.to_string())),
        }
    }
}

/// Sparse contact details of one user. Empty strings mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetailEntry {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub telegram: String,
}

impl UserDetailEntry {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Value of a single field. `All` has no single value.
    pub fn get(&self, detail: UserDetail) -> Option<&str> {
        let value = match detail {
            UserDetail::Email => &self.email,
            UserDetail::Telegram => &self.telegram,
            UserDetail::All => return None,
        };
        (!value.is_empty()).then_some(value.as_str())
    }

    /// Set a single field; an empty value clears it. `All` clears everything.
    pub fn set(&mut self, detail: UserDetail, value: &str) {
        match detail {
            UserDetail::Email => self.email = value.to_string(),
            UserDetail::Telegram => self.telegram = value.to_string(),
            UserDetail::All => {
                self.email.clear();
                self.telegram.clear();
            }
        }
    }

    /// A copy carrying only `detail`, as returned by single-field requests.
    pub fn only(&self, detail: UserDetail) -> Self {
        let mut out = Self::new(&self.user_id);
        if let Some(value) = self.get(detail) {
            out.set(detail, value);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.telegram.is_empty()
    }
}
