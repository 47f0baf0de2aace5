//! Sorting and aggregation helpers shared by the engines.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_types::{Comment, PostInfo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    Time,
    Score,
    Controversy,
}

fn parse_sort(sort: &str) -> (SortField, bool) {
    let (descending, name) = match sort.as_bytes().first() {
        Some(b'-') => (true, &sort[1..]),
        Some(b'+') => (false, &sort[1..]),
        _ => (false, sort),
    };
    match name {
        "score" => (SortField::Score, descending),
        "controversy" => (SortField::Controversy, descending),
        "time" | "active" => (SortField::Time, descending),
        _ => (SortField::Time, false),
    }
}

/// Sort comments in place.
///
/// Accepts `time`, `score`, `controversy` and `active` with an optional `+`
/// or `-` prefix. Unknown values sort by time ascending. Score and
/// controversy ties fall back to time ascending.
pub fn sort_comments(comments: &mut [Comment], sort: &str) {
    let (field, descending) = parse_sort(sort);
    comments.sort_by(|a, b| {
        let primary = match field {
            SortField::Time => a.timestamp.cmp(&b.timestamp),
            SortField::Score => a.score.cmp(&b.score),
            SortField::Controversy => a.controversy.total_cmp(&b.controversy),
        };
        let primary = if descending { primary.reverse() } else { primary };
        match (primary, field) {
            (Ordering::Equal, SortField::Time) => Ordering::Equal,
            (Ordering::Equal, _) => a.timestamp.cmp(&b.timestamp),
            (ord, _) => ord,
        }
    });
}

/// Count and time range of the live comments in `comments`.
pub fn live_time_range<'a>(
    comments: impl IntoIterator<Item = &'a Comment>,
) -> Option<(usize, DateTime<Utc>, DateTime<Utc>)> {
    comments
        .into_iter()
        .filter(|c| !c.deleted)
        .fold(None, |acc, c| match acc {
            None => Some((1, c.timestamp, c.timestamp)),
            Some((n, first, last)) => Some((n + 1, first.min(c.timestamp), last.max(c.timestamp))),
        })
}

/// Recompute counters of `info` from the comments of its post.
///
/// When no live comment remains the count drops to zero and both times
/// collapse to the previous first time.
pub fn recount<'a>(info: &mut PostInfo, comments: impl IntoIterator<Item = &'a Comment>) {
    match live_time_range(comments) {
        Some((count, first, last)) => {
            info.count = count;
            info.first_time = first;
            info.last_time = last;
        }
        None => {
            info.count = 0;
            info.last_time = info.first_time;
        }
    }
}

/// True when the post is older than `age`, counted from its first comment.
pub fn expired_by_age(info: Option<&PostInfo>, age: Option<Duration>, now: DateTime<Utc>) -> bool {
    let (Some(info), Some(age)) = (info, age) else {
        return false;
    };
    if age.is_zero() {
        return false;
    }
    match chrono::Duration::from_std(age) {
        Ok(age) => info
            .first_time
            .checked_add_signed(age)
            .is_some_and(|deadline| deadline < now),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quill_types::{Locator, User};

    fn comment(id: &str, secs: i64, score: i64) -> Comment {
        Comment {
            id: id.into(),
            text: format!("text {id}"),
            user: User::new("u1", "user one"),
            locator: Locator::new("radio-t", "https://radio-t.com/p/1"),
            score,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            ..Default::default()
        }
    }

    fn ids(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn sort_by_time() {
        let mut cs = vec![comment("b", 20, 0), comment("a", 10, 0), comment("c", 30, 0)];
        sort_comments(&mut cs, "time");
        assert_eq!(ids(&cs), ["a", "b", "c"]);
        sort_comments(&mut cs, "-time");
        assert_eq!(ids(&cs), ["c", "b", "a"]);
        sort_comments(&mut cs, "+active");
        assert_eq!(ids(&cs), ["a", "b", "c"]);
    }

    #[test]
    fn score_ties_fall_back_to_time() {
        let mut cs = vec![comment("late", 30, 5), comment("low", 10, 1), comment("early", 20, 5)];
        sort_comments(&mut cs, "-score");
        assert_eq!(ids(&cs), ["early", "late", "low"]);
        sort_comments(&mut cs, "score");
        assert_eq!(ids(&cs), ["low", "early", "late"]);
    }

    #[test]
    fn controversy_sort() {
        let mut cs = vec![comment("a", 10, 0), comment("b", 20, 0)];
        cs[0].controversy = 0.5;
        cs[1].controversy = 2.25;
        sort_comments(&mut cs, "-controversy");
        assert_eq!(ids(&cs), ["b", "a"]);
    }

    #[test]
    fn unknown_sort_is_time_ascending() {
        let mut cs = vec![comment("b", 20, 0), comment("a", 10, 0)];
        sort_comments(&mut cs, "-bogus");
        assert_eq!(ids(&cs), ["a", "b"]);
        sort_comments(&mut cs, "");
        assert_eq!(ids(&cs), ["a", "b"]);
    }

    #[test]
    fn recount_skips_deleted() {
        let mut cs = vec![comment("a", 10, 0), comment("b", 20, 0), comment("c", 30, 0)];
        cs[2].deleted = true;
        let mut info = PostInfo::first("u", cs[0].timestamp);
        recount(&mut info, &cs);
        assert_eq!(info.count, 2);
        assert_eq!(info.first_time, cs[0].timestamp);
        assert_eq!(info.last_time, cs[1].timestamp);
    }

    #[test]
    fn recount_without_live_comments_collapses_times() {
        let mut cs = vec![comment("a", 10, 0), comment("b", 20, 0)];
        let mut info = PostInfo::first("u", cs[0].timestamp);
        recount(&mut info, &cs);
        assert_eq!(info.last_time, cs[1].timestamp);

        cs.iter_mut().for_each(|c| c.deleted = true);
        recount(&mut info, &cs);
        assert_eq!(info.count, 0);
        assert_eq!(info.first_time, cs[0].timestamp);
        assert_eq!(info.last_time, info.first_time);
    }

    #[test]
    fn age_expiry() {
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        let info = PostInfo::first("u", Utc.timestamp_opt(1_000_000 - 100, 0).unwrap());
        assert!(expired_by_age(Some(&info), Some(Duration::from_secs(10)), now));
        assert!(!expired_by_age(Some(&info), Some(Duration::from_secs(1000)), now));
        assert!(!expired_by_age(Some(&info), None, now));
        assert!(!expired_by_age(None, Some(Duration::from_secs(10)), now));
        assert!(!expired_by_age(Some(&info), Some(Duration::ZERO), now));
    }
}
