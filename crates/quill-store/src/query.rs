//! Request validation and dispatch shared by the engines.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_types::{
    permanent_until, Comment, CommentRef, Flag, FlagRequest, FindRequest, UserDetail,
    UserDetailRequest,
};

use crate::error::{EngineError, EngineResult};

/// Default and maximum size of the site-wide recent list.
pub const MAX_LAST_LIMIT: usize = 1000;
/// Default and maximum page size of user listings.
pub const MAX_USER_LIMIT: usize = 500;
/// Default page size of post listings.
pub const DEFAULT_INFO_LIMIT: usize = 1000;

/// Site ids name database files, so they may not be empty or walk the
/// filesystem.
pub(crate) fn valid_site_id(site_id: &str) -> bool {
    !(site_id.is_empty()
        || site_id.contains(['/', '\\'])
        || site_id == "."
        || site_id == "..")
}

pub(crate) fn clamp_limit(limit: usize, max: usize) -> usize {
    if limit == 0 || limit > max {
        max
    } else {
        limit
    }
}

/// Which listing a find request asks for.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FindMode<'a> {
    Post { url: &'a str },
    Site { limit: usize },
    User { user_id: &'a str, limit: usize, skip: usize },
}

impl<'a> FindMode<'a> {
    pub(crate) fn of(req: &'a FindRequest) -> Self {
        if req.locator.has_url() {
            Self::Post { url: &req.locator.url }
        } else if !req.user_id.is_empty() {
            Self::User {
                user_id: &req.user_id,
                limit: clamp_limit(req.limit, MAX_USER_LIMIT),
                skip: req.skip,
            }
        } else {
            Self::Site {
                limit: clamp_limit(req.limit, MAX_LAST_LIMIT),
            }
        }
    }
}

/// Reject comments that cannot be stored.
pub(crate) fn check_new_comment(comment: &Comment) -> EngineResult<()> {
    let invalid = |reason: String| -> EngineResult<()> {
        Err(EngineError::InvalidRequest(format!("invalid create request: {reason}")))
    };
    if comment.id.is_empty() {
        return invalid("empty comment id".into());
    }
    if !comment.locator.has_url() {
        return invalid("empty url".into());
    }
    if comment.user.id.is_empty() {
        return invalid("empty user id".into());
    }
    if let Err(err) = CommentRef::validate_url(&comment.locator.url) {
        return invalid(err.to_string());
    }
    Ok(())
}

/// Make sure a flag request names the target its flag applies to.
pub(crate) fn check_flag_target(req: &FlagRequest) -> EngineResult<()> {
    let missing = match req.flag {
        Flag::ReadOnly if !req.locator.has_url() => "url",
        Flag::Blocked | Flag::Verified if req.user_id.is_empty() => "user id",
        _ => return Ok(()),
    };
    Err(EngineError::InvalidRequest(format!(
        "invalid flag request {}: empty {missing}",
        req.flag
    )))
}

/// Expiry of a block: `now + ttl`, or permanent without a positive ttl.
pub(crate) fn block_until(now: DateTime<Utc>, ttl: Option<Duration>) -> DateTime<Utc> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or_else(|| permanent_until(now))
}

/// What a user-detail request does.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DetailOp<'a> {
    ListAll,
    GetAll { user_id: &'a str },
    Get { user_id: &'a str, detail: UserDetail },
    Set { user_id: &'a str, detail: UserDetail, value: &'a str },
}

impl<'a> DetailOp<'a> {
    pub(crate) fn of(req: &'a UserDetailRequest) -> EngineResult<Self> {
        let user_id = req.user_id.as_str();
        match (req.detail, req.update.as_deref()) {
            (UserDetail::All, Some(_)) => Err(EngineError::InvalidRequest(
                "unsupported request with userdetail all".into(),
            )),
            (UserDetail::All, None) if user_id.is_empty() => Ok(Self::ListAll),
            (UserDetail::All, None) => Ok(Self::GetAll { user_id }),
            _ if user_id.is_empty() => Err(EngineError::InvalidRequest(
                "userid cannot be empty in request for single detail".into(),
            )),
            (detail, None) => Ok(Self::Get { user_id, detail }),
            (detail, Some(value)) => Ok(Self::Set { user_id, detail, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_types::{Locator, User};

    #[test]
    fn find_mode_selection() {
        let post = FindRequest::for_post(Locator::new("s", "u"), "time");
        assert_eq!(FindMode::of(&post), FindMode::Post { url: "u" });

        let user = FindRequest::for_user("s", "u1", 0, 3);
        assert_eq!(
            FindMode::of(&user),
            FindMode::User { user_id: "u1", limit: MAX_USER_LIMIT, skip: 3 }
        );

        let site = FindRequest::for_site("s", 5000);
        assert_eq!(FindMode::of(&site), FindMode::Site { limit: MAX_LAST_LIMIT });
        assert_eq!(FindMode::of(&FindRequest::for_site("s", 7)), FindMode::Site { limit: 7 });
    }

    #[test]
    fn new_comment_checks() {
        let mut c = Comment {
            id: "id-1".into(),
            user: User::new("u1", "name"),
            locator: Locator::new("s", "https://example.com/a"),
            ..Default::default()
        };
        assert!(check_new_comment(&c).is_ok());

        c.locator.url = "https://example.com/!!bad".into();
        let err = check_new_comment(&c).unwrap_err();
        assert!(err.to_string().starts_with("invalid create request:"), "{err}");

        c.locator.url = "https://example.com/a".into();
        c.id.clear();
        assert!(matches!(check_new_comment(&c), Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn flag_targets() {
        assert!(check_flag_target(&FlagRequest::read_only(Locator::site("s"))).is_err());
        assert!(check_flag_target(&FlagRequest::read_only(Locator::new("s", "u"))).is_ok());
        let err = check_flag_target(&FlagRequest::user(Flag::Blocked, "s", "")).unwrap_err();
        assert_eq!(err.to_string(), "invalid flag request blocked: empty user id");
    }

    #[test]
    fn block_expiry() {
        let now = Utc::now();
        assert_eq!(block_until(now, Some(Duration::from_secs(60))), now + chrono::Duration::seconds(60));
        assert_eq!(block_until(now, None), permanent_until(now));
        assert_eq!(block_until(now, Some(Duration::ZERO)), permanent_until(now));
    }

    #[test]
    fn detail_ops() {
        assert_eq!(DetailOp::of(&UserDetailRequest::all("s")).unwrap(), DetailOp::ListAll);
        assert_eq!(
            DetailOp::of(&UserDetailRequest::get(UserDetail::All, "s", "u1")).unwrap(),
            DetailOp::GetAll { user_id: "u1" }
        );
        assert_eq!(
            DetailOp::of(&UserDetailRequest::set(UserDetail::All, "s", "u1", "x"))
                .unwrap_err()
                .to_string(),
            "unsupported request with userdetail all"
        );
        assert_eq!(
            DetailOp::of(&UserDetailRequest::get(UserDetail::Email, "s", ""))
                .unwrap_err()
                .to_string(),
            "userid cannot be empty in request for single detail"
        );
        assert_eq!(
            DetailOp::of(&UserDetailRequest::set(UserDetail::Email, "s", "u1", "a@b")).unwrap(),
            DetailOp::Set { user_id: "u1", detail: UserDetail::Email, value: "a@b" }
        );
    }
}
