use std::fmt;

use crate::error::TypeError;

/// Separator between the post URL and the comment id in a reference.
pub const REF_SEPARATOR: &str = "!!";

/// Pointer from a time-ordered index back to a comment row.
///
/// Encoded as `"<url>!!<comment_id>"`. URLs may not contain the separator,
/// which makes the first occurrence the split point.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentRef {
    pub url: String,
    pub id: String,
}

impl CommentRef {
    pub fn new(url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{REF_SEPARATOR}{}", self.url, self.id)
    }

    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        match raw.split_once(REF_SEPARATOR) {
            Some((url, id)) if !url.is_empty() && !id.is_empty() => Ok(Self::new(url, id)),
            _ => Err(TypeError::InvalidReference(raw.to_string())),
        }
    }

    /// Reject URLs that would make a reference ambiguous. A trailing `!`
    /// merges with the separator and moves the split point.
    pub fn validate_url(url: &str) -> Result<(), TypeError> {
        if url.contains(REF_SEPARATOR) {
            return Err(TypeError::ReservedSeparator(url.to_string()));
        }
        if url.ends_with('!') {
            return Err(TypeError::AmbiguousUrl(url.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for CommentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{REF_SEPARATOR}{}", self.url, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_simple() {
        let r = CommentRef::parse("https://radio-t.com/p/1!!id-1").unwrap();
        assert_eq!(r.url, "https://radio-t.com/p/1");
        assert_eq!(r.id, "id-1");
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!(CommentRef::parse("no-separator").is_err());
        assert!(CommentRef::parse("!!id").is_err());
        assert!(CommentRef::parse("url!!").is_err());
    }

    #[test]
    fn url_with_separator_rejected() {
        assert_eq!(
            CommentRef::validate_url("https://x.com/a!!b"),
            Err(TypeError::ReservedSeparator("https://x.com/a!!b".into()))
        );
        assert!(CommentRef::validate_url("https://x.com/a!b").is_ok());
    }

    #[test]
    fn url_with_trailing_bang_rejected() {
        assert_eq!(
            CommentRef::validate_url("https://radio-t.com/wow!"),
            Err(TypeError::AmbiguousUrl("https://radio-t.com/wow!".into()))
        );
    }

    proptest! {
        #[test]
        fn encode_parse_roundtrip(url in "[a-z:/.?=&!]{1,40}", id in "[a-z0-9!-]{1,20}") {
            prop_assume!(CommentRef::validate_url(&url).is_ok());
            let r = CommentRef::new(url, id);
            prop_assert_eq!(CommentRef::parse(&r.encode()).unwrap(), r);
        }
    }
}
