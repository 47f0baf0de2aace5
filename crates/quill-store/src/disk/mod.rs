//! redb-backed comment engine.
//!
//! One database file per site (`<path>/<site>.db`), opened up front. Each
//! operation runs in a single read or write transaction, so multi-table
//! updates (post, indexes and info) are atomic.

mod comments;
mod delete;
mod details;
mod flags;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use quill_types::{
    Comment, CommentRef, DeleteRequest, FindRequest, FlagRequest, FlaggedUser, GetRequest,
    InfoRequest, PostInfo, UserDetailEntry, UserDetailRequest,
};
use redb::{Database, ReadableTable, Table};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::query::valid_site_id;
use crate::tables::{Bytes, PostKey, Tables, UserIndexKey};
use crate::traits::Engine;

/// Settings of a [`DiskEngine`].
#[derive(Clone, Debug, Default)]
pub struct DiskEngineConfig {
    /// Directory holding one database file per site.
    pub path: PathBuf,
    /// Sites to open.
    pub sites: Vec<String>,
    /// Posts older than this (from their first comment) refuse new comments.
    pub read_only_age: Option<Duration>,
}

impl DiskEngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.sites.push(site_id.into());
        self
    }

    pub fn with_read_only_age(mut self, age: Duration) -> Self {
        self.read_only_age = Some(age);
        self
    }
}

/// Comment engine storing every site in its own redb database.
pub struct DiskEngine {
    path: PathBuf,
    read_only_age: Option<Duration>,
    sites: RwLock<HashMap<String, Arc<Database>>>,
    closed: AtomicBool,
}

impl DiskEngine {
    /// Open (or create) the database of every configured site.
    pub fn open(config: DiskEngineConfig) -> EngineResult<Self> {
        std::fs::create_dir_all(&config.path).map_err(|e| {
            EngineError::Storage(format!("can't create {}: {e}", config.path.display()))
        })?;

        let mut sites = HashMap::new();
        for site_id in &config.sites {
            if !valid_site_id(site_id) {
                return Err(EngineError::InvalidRequest(format!("invalid site id {site_id:?}")));
            }
            sites.insert(site_id.clone(), Arc::new(open_site(&config.path, site_id)?));
        }

        Ok(Self {
            path: config.path,
            read_only_age: config.read_only_age,
            sites: RwLock::new(sites),
            closed: AtomicBool::new(false),
        })
    }

    /// Directory holding the site databases.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids of the open sites, sorted.
    pub fn sites(&self) -> Vec<String> {
        let sites = self.sites.read().expect("lock poisoned");
        let mut ids: Vec<String> = sites.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn site(&self, site_id: &str) -> EngineResult<Arc<Database>> {
        self.sites
            .read()
            .expect("lock poisoned")
            .get(site_id)
            .cloned()
            .ok_or_else(|| EngineError::SiteNotFound(site_id.to_string()))
    }

    /// Database of a site, created on first write. Closed engines and ids
    /// that can't name a file still report the site as missing.
    fn site_or_create(&self, site_id: &str) -> EngineResult<Arc<Database>> {
        if let Some(db) = self.sites.read().expect("lock poisoned").get(site_id) {
            return Ok(Arc::clone(db));
        }

        let mut sites = self.sites.write().expect("lock poisoned");
        if let Some(db) = sites.get(site_id) {
            return Ok(Arc::clone(db));
        }
        if self.closed.load(Ordering::Acquire) || !valid_site_id(site_id) {
            return Err(EngineError::SiteNotFound(site_id.to_string()));
        }
        let db = Arc::new(open_site(&self.path, site_id)?);
        sites.insert(site_id.to_string(), Arc::clone(&db));
        Ok(db)
    }
}

fn open_site(dir: &Path, site_id: &str) -> EngineResult<Database> {
    let file = dir.join(format!("{site_id}.db"));
    let db = Database::create(&file)?;
    init_tables(&db)?;
    tracing::info!(site = %site_id, path = %file.display(), "site database opened");
    Ok(db)
}

fn init_tables(db: &Database) -> EngineResult<()> {
    let txn = db.begin_write()?;
    txn.open_table(Tables::POSTS)?;
    txn.open_table(Tables::LAST)?;
    txn.open_table(Tables::USERS)?;
    txn.open_table(Tables::USER_DETAILS)?;
    txn.open_table(Tables::BLOCKS)?;
    txn.open_table(Tables::INFO)?;
    txn.open_table(Tables::READONLY)?;
    txn.open_table(Tables::VERIFIED)?;
    txn.commit()?;
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> EngineResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> EngineResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn read_json<T, D>(table: &T, key: &str) -> EngineResult<Option<D>>
where
    T: ReadableTable<&'static str, Bytes>,
    D: DeserializeOwned,
{
    table.get(key)?.map(|guard| decode(guard.value())).transpose()
}

fn write_json<S: Serialize>(
    table: &mut Table<'_, &'static str, Bytes>,
    key: &str,
    value: &S,
) -> EngineResult<()> {
    table.insert(key, encode(value)?.as_slice())?;
    Ok(())
}

fn load_comment<T>(posts: &T, url: &str, id: &str) -> EngineResult<Option<Comment>>
where
    T: ReadableTable<PostKey, Bytes>,
{
    posts
        .get((url, id))?
        .map(|guard| decode(guard.value()))
        .transpose()
}

/// Comment behind an index entry. Missing comments are logged and skipped.
fn resolve<T>(posts: &T, raw: &str) -> EngineResult<Option<Comment>>
where
    T: ReadableTable<PostKey, Bytes>,
{
    let r = CommentRef::parse(raw)?;
    let found = load_comment(posts, &r.url, &r.id)?;
    if found.is_none() {
        tracing::warn!(reference = raw, "indexed comment is missing");
    }
    Ok(found)
}

/// Every comment of a post in id order.
fn post_comments<T>(posts: &T, url: &str) -> EngineResult<Vec<Comment>>
where
    T: ReadableTable<PostKey, Bytes>,
{
    let mut out = Vec::new();
    for item in posts.range((url, "")..)? {
        let (key, value) = item?;
        if key.value().0 != url {
            break;
        }
        out.push(decode(value.value())?);
    }
    Ok(out)
}

/// `(time key, reference)` entries of a user, oldest first.
fn user_index<T>(users: &T, user_id: &str) -> EngineResult<Vec<(String, String)>>
where
    T: ReadableTable<UserIndexKey, ()>,
{
    let mut out = Vec::new();
    for item in users.range((user_id, "", "")..)? {
        let (key, _) = item?;
        let (user, ts, raw) = key.value();
        if user != user_id {
            break;
        }
        out.push((ts.to_string(), raw.to_string()));
    }
    Ok(out)
}

impl Engine for DiskEngine {
    fn create(&self, comment: &Comment) -> EngineResult<String> {
        self.create_comment(comment)
    }

    fn get(&self, req: &GetRequest) -> EngineResult<Comment> {
        self.get_comment(req)
    }

    fn update(&self, comment: &Comment) -> EngineResult<()> {
        self.update_comment(comment)
    }

    fn find(&self, req: &FindRequest) -> EngineResult<Vec<Comment>> {
        self.find_comments(req)
    }

    fn count(&self, req: &FindRequest) -> EngineResult<usize> {
        self.count_comments(req)
    }

    fn info(&self, req: &InfoRequest) -> EngineResult<Vec<PostInfo>> {
        self.post_info(req)
    }

    fn flag(&self, req: &FlagRequest) -> EngineResult<bool> {
        self.set_or_read_flag(req)
    }

    fn list_flags(&self, req: &FlagRequest) -> EngineResult<Vec<FlaggedUser>> {
        self.flagged_users(req)
    }

    fn user_detail(&self, req: &UserDetailRequest) -> EngineResult<Vec<UserDetailEntry>> {
        self.user_details(req)
    }

    fn delete(&self, req: &DeleteRequest) -> EngineResult<()> {
        self.delete_in_site(req)
    }

    fn close(&self) -> EngineResult<()> {
        let mut sites = self.sites.write().expect("lock poisoned");
        self.closed.store(true, Ordering::Release);
        let closed: Vec<String> = sites.drain().map(|(site, _)| site).collect();
        tracing::info!(sites = ?closed, "site databases closed");
        Ok(())
    }
}

impl std::fmt::Debug for DiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskEngine")
            .field("path", &self.path)
            .field("sites", &self.sites())
            .field("read_only_age", &self.read_only_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_one_file_per_site() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DiskEngine::open(
            DiskEngineConfig::new(dir.path()).with_site("radio-t").with_site("blog"),
        )
        .unwrap();
        assert_eq!(engine.sites(), vec!["blog".to_string(), "radio-t".to_string()]);
        assert!(dir.path().join("radio-t.db").exists());
        assert!(dir.path().join("blog.db").exists());
    }

    #[test]
    fn bad_site_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "../etc", "a/b", ".."] {
            let err = DiskEngine::open(DiskEngineConfig::new(dir.path()).with_site(bad)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidRequest(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn close_forgets_sites() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DiskEngine::open(DiskEngineConfig::new(dir.path()).with_site("s")).unwrap();
        engine.close().unwrap();
        let err = engine.get(&GetRequest::new(quill_types::Locator::new("s", "u"), "c")).unwrap_err();
        assert_eq!(err.to_string(), "site \"s\" not found");

        let err = engine
            .create(&quill_types::Comment {
                id: "c".into(),
                user: quill_types::User::new("u", "u"),
                locator: quill_types::Locator::new("s", "https://radio-t.com"),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "site \"s\" not found");
    }

    #[test]
    fn first_write_opens_site_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DiskEngine::open(DiskEngineConfig::new(dir.path())).unwrap();
        assert!(engine.sites().is_empty());

        let req = FlagRequest::user(quill_types::Flag::Verified, "blog", "u1");
        assert!(matches!(engine.flag(&req), Err(EngineError::SiteNotFound(_))));
        assert!(engine.flag(&req.clone().set(true)).unwrap());
        assert_eq!(engine.sites(), vec!["blog".to_string()]);
        assert!(dir.path().join("blog.db").exists());

        let bad = FlagRequest::user(quill_types::Flag::Verified, "../x", "u1").set(true);
        assert!(matches!(engine.flag(&bad), Err(EngineError::SiteNotFound(_))));
    }
}
