use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_types::{
    time_key, BlockedUser, Comment, CommentRef, DeleteMode, DeleteRequest, Flag, FlagRequest,
    FlaggedUser, FindRequest, GetRequest, InfoRequest, PostInfo, UserDetailEntry,
    UserDetailRequest,
};

use crate::error::{EngineError, EngineResult};
use crate::query::{
    block_until, check_flag_target, check_new_comment, clamp_limit, valid_site_id, DetailOp,
    FindMode, DEFAULT_INFO_LIMIT,
};
use crate::sort::{expired_by_age, recount, sort_comments};
use crate::traits::Engine;

/// `(time key, encoded reference)`, the ordering of the time indexes.
type IndexKey = (String, String);

#[derive(Default)]
struct SiteData {
    posts: BTreeMap<String, BTreeMap<String, Comment>>,
    last: BTreeSet<IndexKey>,
    users: BTreeMap<String, BTreeSet<IndexKey>>,
    info: BTreeMap<String, PostInfo>,
    read_only: BTreeMap<String, DateTime<Utc>>,
    blocks: BTreeMap<String, DateTime<Utc>>,
    verified: BTreeMap<String, DateTime<Utc>>,
    details: BTreeMap<String, UserDetailEntry>,
}

impl SiteData {
    fn comment(&self, url: &str, id: &str) -> Option<&Comment> {
        self.posts.get(url).and_then(|post| post.get(id))
    }

    fn resolve(&self, raw: &str) -> EngineResult<Option<&Comment>> {
        let r = CommentRef::parse(raw)?;
        let found = self.comment(&r.url, &r.id);
        if found.is_none() {
            tracing::warn!(reference = raw, "indexed comment is missing");
        }
        Ok(found)
    }

    fn recount(&mut self, url: &str) {
        if let (Some(info), Some(post)) = (self.info.get_mut(url), self.posts.get(url)) {
            recount(info, post.values());
        }
    }

    fn delete_comment(&mut self, url: &str, id: &str, mode: DeleteMode) -> EngineResult<()> {
        let comment = self
            .posts
            .get_mut(url)
            .and_then(|post| post.get_mut(id))
            .ok_or(EngineError::NotFound)?;
        let was_deleted = comment.deleted;
        comment.set_deleted(mode);
        let key = (time_key(&comment.timestamp), comment.reference().encode());
        self.last.remove(&key);
        if !was_deleted {
            self.recount(url);
        }
        Ok(())
    }

    fn newest_by_user(&self, user_id: &str) -> Option<&Comment> {
        self.users
            .get(user_id)?
            .iter()
            .rev()
            .find_map(|(_, raw)| self.resolve(raw).ok().flatten())
    }
}

struct State {
    sites: HashMap<String, SiteData>,
    closed: bool,
}

/// In-memory comment engine.
///
/// Intended for tests and embedding. Sites are created on first write (or up
/// front with [`with_sites`](Self::with_sites)); reads on a site that was
/// never written fail like the disk engine does. Everything lives behind a
/// single `RwLock`.
pub struct InMemoryEngine {
    state: RwLock<State>,
    read_only_age: Option<Duration>,
}

impl InMemoryEngine {
    /// Create an engine with no sites.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                sites: HashMap::new(),
                closed: false,
            }),
            read_only_age: None,
        }
    }

    /// Create an engine with empty sites already registered.
    pub fn with_sites<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = Self::new();
        {
            let mut state = engine.state.write().expect("lock poisoned");
            for site in sites {
                state.sites.entry(site.into()).or_default();
            }
        }
        engine
    }

    /// Posts older than `age` (from their first comment) become read-only.
    pub fn with_read_only_age(mut self, age: Duration) -> Self {
        self.read_only_age = Some(age);
        self
    }

    /// Ids of the registered sites, sorted.
    pub fn sites(&self) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        let mut sites: Vec<String> = state.sites.keys().cloned().collect();
        sites.sort();
        sites
    }

    fn read_site<R>(
        &self,
        site_id: &str,
        f: impl FnOnce(&SiteData) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let state = self.state.read().expect("lock poisoned");
        let data = state
            .sites
            .get(site_id)
            .ok_or_else(|| EngineError::SiteNotFound(site_id.to_string()))?;
        f(data)
    }

    fn write_site<R>(
        &self,
        site_id: &str,
        create: bool,
        f: impl FnOnce(&mut SiteData) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut state = self.state.write().expect("lock poisoned");
        if create && !state.closed && valid_site_id(site_id) {
            state.sites.entry(site_id.to_string()).or_default();
        }
        let data = state
            .sites
            .get_mut(site_id)
            .ok_or_else(|| EngineError::SiteNotFound(site_id.to_string()))?;
        f(data)
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for InMemoryEngine {
    fn create(&self, comment: &Comment) -> EngineResult<String> {
        check_new_comment(comment)?;
        let now = Utc::now();
        self.write_site(&comment.locator.site_id, true, |data| {
            let url = &comment.locator.url;
            if data.read_only.contains_key(url)
                || expired_by_age(data.info.get(url), self.read_only_age, now)
            {
                return Err(EngineError::ReadOnly(url.clone()));
            }
            let post = data.posts.entry(url.clone()).or_default();
            if post.contains_key(&comment.id) {
                return Err(EngineError::DuplicateId(comment.id.clone()));
            }
            post.insert(comment.id.clone(), comment.clone());

            let key = (time_key(&comment.timestamp), comment.reference().encode());
            data.users
                .entry(comment.user.id.clone())
                .or_default()
                .insert(key.clone());
            let info = data.info.entry(url.clone()).or_insert_with(|| PostInfo {
                count: 0,
                ..PostInfo::first(url, comment.timestamp)
            });
            if !comment.deleted {
                info.record(comment.timestamp);
                data.last.insert(key);
            }
            Ok(comment.id.clone())
        })
    }

    fn get(&self, req: &GetRequest) -> EngineResult<Comment> {
        self.read_site(&req.locator.site_id, |data| {
            data.comment(&req.locator.url, &req.comment_id)
                .cloned()
                .ok_or(EngineError::NotFound)
        })
    }

    fn update(&self, comment: &Comment) -> EngineResult<()> {
        let url = &comment.locator.url;
        self.write_site(&comment.locator.site_id, false, |data| {
            let (toggled, key) = {
                let stored = data
                    .posts
                    .get_mut(url)
                    .and_then(|post| post.get_mut(&comment.id))
                    .ok_or(EngineError::NotFound)?;
                let mut updated = comment.clone();
                updated.restore_immutable(stored);
                let toggled = stored.deleted != updated.deleted;
                let key = (time_key(&updated.timestamp), updated.reference().encode());
                *stored = updated;
                (toggled, key)
            };
            if toggled {
                if comment.deleted {
                    data.last.remove(&key);
                } else {
                    data.last.insert(key);
                }
                data.recount(url);
            }
            Ok(())
        })
    }

    fn find(&self, req: &FindRequest) -> EngineResult<Vec<Comment>> {
        self.read_site(&req.locator.site_id, |data| match FindMode::of(req) {
            FindMode::Post { url } => {
                let mut comments: Vec<Comment> = data
                    .posts
                    .get(url)
                    .into_iter()
                    .flat_map(|post| post.values())
                    .filter(|c| req.since.map_or(true, |since| c.timestamp > since))
                    .cloned()
                    .collect();
                sort_comments(&mut comments, &req.sort);
                Ok(comments)
            }
            FindMode::Site { limit } => {
                let since = req.since.as_ref().map(time_key);
                let mut out = Vec::new();
                for (key, raw) in data.last.iter().rev() {
                    if since.as_ref().is_some_and(|since| key <= since) {
                        break;
                    }
                    match data.resolve(raw)? {
                        Some(c) if !c.deleted => out.push(c.clone()),
                        _ => continue,
                    }
                    if out.len() >= limit {
                        break;
                    }
                }
                Ok(out)
            }
            FindMode::User { user_id, limit, skip } => {
                let Some(index) = data.users.get(user_id) else {
                    return Ok(Vec::new());
                };
                let mut out = Vec::new();
                for (_, raw) in index.iter().rev().skip(skip).take(limit) {
                    if let Some(c) = data.resolve(raw)? {
                        out.push(c.clone());
                    }
                }
                Ok(out)
            }
        })
    }

    fn count(&self, req: &FindRequest) -> EngineResult<usize> {
        self.read_site(&req.locator.site_id, |data| {
            if !req.user_id.is_empty() {
                return Ok(data.users.get(&req.user_id).map_or(0, |index| index.len()));
            }
            Ok(data
                .posts
                .get(&req.locator.url)
                .map_or(0, |post| post.values().filter(|c| !c.deleted).count()))
        })
    }

    fn info(&self, req: &InfoRequest) -> EngineResult<Vec<PostInfo>> {
        let age = req.read_only_age.or(self.read_only_age);
        let now = Utc::now();
        self.read_site(&req.locator.site_id, |data| {
            let with_flag = |info: &PostInfo| PostInfo {
                read_only: data.read_only.contains_key(&info.url)
                    || expired_by_age(Some(info), age, now),
                ..info.clone()
            };
            if req.locator.has_url() {
                let url = &req.locator.url;
                return data
                    .info
                    .get(url)
                    .map(|info| vec![with_flag(info)])
                    .ok_or_else(|| EngineError::PostNotFound(url.clone()));
            }
            Ok(data
                .info
                .values()
                .rev()
                .skip(req.skip)
                .take(clamp_limit(req.limit, DEFAULT_INFO_LIMIT))
                .map(with_flag)
                .collect())
        })
    }

    fn flag(&self, req: &FlagRequest) -> EngineResult<bool> {
        check_flag_target(req)?;
        let now = Utc::now();
        let site_id = &req.locator.site_id;
        let Some(value) = req.update else {
            return self.read_site(site_id, |data| {
                Ok(match req.flag {
                    Flag::ReadOnly => data.read_only.contains_key(&req.locator.url),
                    Flag::Blocked => data
                        .blocks
                        .get(&req.user_id)
                        .is_some_and(|until| now < *until),
                    Flag::Verified => data.verified.contains_key(&req.user_id),
                })
            });
        };
        self.write_site(site_id, true, |data| {
            let (table, key, stamp) = match req.flag {
                Flag::ReadOnly => (&mut data.read_only, &req.locator.url, now),
                Flag::Blocked => (&mut data.blocks, &req.user_id, block_until(now, req.ttl)),
                Flag::Verified => (&mut data.verified, &req.user_id, now),
            };
            if value {
                table.insert(key.clone(), stamp);
            } else {
                table.remove(key);
            }
            Ok(value)
        })
    }

    fn list_flags(&self, req: &FlagRequest) -> EngineResult<Vec<FlaggedUser>> {
        let now = Utc::now();
        self.read_site(&req.locator.site_id, |data| match req.flag {
            Flag::Verified => Ok(data
                .verified
                .keys()
                .map(|id| FlaggedUser::Verified(id.clone()))
                .collect()),
            Flag::Blocked => Ok(data
                .blocks
                .iter()
                .filter(|(_, until)| now < **until)
                .map(|(id, until)| {
                    FlaggedUser::Blocked(BlockedUser {
                        id: id.clone(),
                        name: data
                            .newest_by_user(id)
                            .map(|c| c.user.name.clone())
                            .unwrap_or_default(),
                        until: *until,
                    })
                })
                .collect()),
            Flag::ReadOnly => Err(EngineError::FlagNotListable(req.flag.to_string())),
        })
    }

    fn user_detail(&self, req: &UserDetailRequest) -> EngineResult<Vec<UserDetailEntry>> {
        let site_id = &req.locator.site_id;
        match DetailOp::of(req)? {
            DetailOp::ListAll => {
                self.read_site(site_id, |data| Ok(data.details.values().cloned().collect()))
            }
            DetailOp::GetAll { user_id } => self.read_site(site_id, |data| {
                Ok(data.details.get(user_id).cloned().into_iter().collect())
            }),
            DetailOp::Get { user_id, detail } => self.read_site(site_id, |data| {
                Ok(data
                    .details
                    .get(user_id)
                    .filter(|entry| entry.get(detail).is_some())
                    .map(|entry| entry.only(detail))
                    .into_iter()
                    .collect())
            }),
            DetailOp::Set { user_id, detail, value } => self.write_site(site_id, true, |data| {
                let entry = data
                    .details
                    .entry(user_id.to_string())
                    .or_insert_with(|| UserDetailEntry::new(user_id));
                entry.set(detail, value);
                if entry.is_empty() {
                    data.details.remove(user_id);
                }
                let mut out = UserDetailEntry::new(user_id);
                out.set(detail, value);
                Ok(vec![out])
            }),
        }
    }

    fn delete(&self, req: &DeleteRequest) -> EngineResult<()> {
        self.write_site(req.site_id(), false, |data| match req {
            DeleteRequest::Comment { locator, comment_id, mode } => {
                data.delete_comment(&locator.url, comment_id, *mode)
            }
            DeleteRequest::User { user_id, mode, .. } => {
                let index: Vec<IndexKey> = data
                    .users
                    .get(user_id)
                    .map(|index| index.iter().cloned().collect())
                    .unwrap_or_default();
                for (_, raw) in &index {
                    let r = CommentRef::parse(raw)?;
                    match data.delete_comment(&r.url, &r.id, *mode) {
                        Err(EngineError::NotFound) => {
                            tracing::warn!(reference = %raw, "skipping missing comment of user");
                        }
                        other => other?,
                    }
                }
                data.details.remove(user_id);
                if *mode == DeleteMode::Hard {
                    data.users.remove(user_id);
                }
                tracing::debug!(user = %user_id, comments = index.len(), "user deleted");
                Ok(())
            }
            DeleteRequest::UserDetail { user_id, detail, .. } => {
                if let Some(entry) = data.details.get_mut(user_id) {
                    entry.set(*detail, "");
                    if entry.is_empty() {
                        data.details.remove(user_id);
                    }
                }
                Ok(())
            }
            DeleteRequest::Site { .. } => {
                *data = SiteData {
                    blocks: std::mem::take(&mut data.blocks),
                    ..Default::default()
                };
                Ok(())
            }
        })
    }

    fn close(&self) -> EngineResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.sites.clear();
        state.closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEngine")
            .field("sites", &self.sites())
            .field("read_only_age", &self.read_only_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_types::{Locator, User};

    fn comment(site: &str, id: &str) -> Comment {
        Comment {
            id: id.into(),
            text: "hello".into(),
            user: User::new("u1", "user one"),
            locator: Locator::new(site, "https://example.com/post"),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    #[test]
    fn site_is_created_on_first_write() {
        let engine = InMemoryEngine::new();
        let err = engine.find(&FindRequest::for_site("blog", 10)).unwrap_err();
        assert_eq!(err.to_string(), "site \"blog\" not found");

        engine.create(&comment("blog", "c1")).unwrap();
        assert_eq!(engine.sites(), vec!["blog".to_string()]);
        assert_eq!(engine.find(&FindRequest::for_site("blog", 10)).unwrap().len(), 1);
    }

    #[test]
    fn with_sites_registers_empty_sites() {
        let engine = InMemoryEngine::with_sites(["a", "b"]);
        assert_eq!(engine.sites(), vec!["a".to_string(), "b".to_string()]);
        assert!(engine.find(&FindRequest::for_site("a", 10)).unwrap().is_empty());
    }

    #[test]
    fn update_on_unknown_site_is_not_a_write() {
        let engine = InMemoryEngine::new();
        let err = engine.update(&comment("ghost", "c1")).unwrap_err();
        assert!(matches!(err, EngineError::SiteNotFound(_)));
        assert!(engine.sites().is_empty());
    }

    #[test]
    fn closed_engine_refuses_everything() {
        let engine = InMemoryEngine::with_sites(["blog"]);
        engine.close().unwrap();
        assert!(matches!(
            engine.create(&comment("blog", "c1")),
            Err(EngineError::SiteNotFound(_))
        ));
        assert!(format!("{engine:?}").contains("InMemoryEngine"));
    }
}
