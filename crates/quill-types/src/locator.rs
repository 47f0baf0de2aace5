use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a commentable resource: the site (tenant) and the post URL.
///
/// The site selects the physical database, the URL selects the post inside
/// it. An empty URL addresses the whole site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "site", default)]
    pub site_id: String,
    #[serde(default)]
    pub url: String,
}

impl Locator {
    pub fn new(site_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            url: url.into(),
        }
    }

    /// A locator addressing a whole site rather than a single post.
    pub fn site(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            url: String::new(),
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site_id, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_both_fields() {
        let a = Locator::new("radio-t", "https://radio-t.com/1");
        let b = Locator::new("radio-t", "https://radio-t.com/2");
        let c = Locator::new("other", "https://radio-t.com/1");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Locator::new("radio-t", "https://radio-t.com/1"));
    }

    #[test]
    fn site_locator_has_no_url() {
        let loc = Locator::site("radio-t");
        assert!(!loc.has_url());
        assert_eq!(loc.site_id, "radio-t");
    }

    #[test]
    fn wire_names() {
        let loc = Locator::new("s", "u");
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["site"], "s");
        assert_eq!(json["url"], "u");
    }
}
