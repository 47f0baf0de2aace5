use std::fmt;

use serde::{Deserialize, Serialize};

/// Administrator record of a site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub site_id: String,
    #[serde(default)]
    pub admin_ids: Vec<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub key: String,
}

/// Comment lifecycle events reported to the admin directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Update,
    Delete,
    Vote,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Vote => "vote",
        };
        f.write_str(name)
    }
}
