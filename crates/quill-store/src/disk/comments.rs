use chrono::Utc;
use quill_types::{time_key, Comment, DeleteMode, FindRequest, GetRequest, InfoRequest, PostInfo};
use redb::{ReadableTable, Table, WriteTransaction};

use super::{
    decode, encode, load_comment, post_comments, read_json, resolve, user_index, write_json,
    DiskEngine,
};
use crate::error::{EngineError, EngineResult};
use crate::query::{check_new_comment, clamp_limit, FindMode, DEFAULT_INFO_LIMIT};
use crate::sort::{expired_by_age, recount, sort_comments};
use crate::tables::{Bytes, PostKey, Tables, TimeIndexKey};

/// Tables touched when a comment changes state inside a write transaction.
pub(super) struct PostTables<'txn> {
    posts: Table<'txn, PostKey, Bytes>,
    last: Table<'txn, TimeIndexKey, ()>,
    info: Table<'txn, &'static str, Bytes>,
}

impl<'txn> PostTables<'txn> {
    pub(super) fn open(txn: &'txn WriteTransaction) -> EngineResult<Self> {
        Ok(Self {
            posts: txn.open_table(Tables::POSTS)?,
            last: txn.open_table(Tables::LAST)?,
            info: txn.open_table(Tables::INFO)?,
        })
    }

    /// Mark a comment deleted, drop it from the site index and refresh the
    /// post counters.
    pub(super) fn delete_comment(&mut self, url: &str, id: &str, mode: DeleteMode) -> EngineResult<()> {
        let mut comment = load_comment(&self.posts, url, id)?.ok_or(EngineError::NotFound)?;
        let was_deleted = comment.deleted;
        comment.set_deleted(mode);
        self.posts.insert((url, id), encode(&comment)?.as_slice())?;

        let key = time_key(&comment.timestamp);
        let reference = comment.reference().encode();
        self.last.remove((key.as_str(), reference.as_str()))?;
        if !was_deleted {
            self.recount(url)?;
        }
        Ok(())
    }

    fn recount(&mut self, url: &str) -> EngineResult<()> {
        let Some(mut info) = read_json::<_, PostInfo>(&self.info, url)? else {
            return Ok(());
        };
        let comments = post_comments(&self.posts, url)?;
        recount(&mut info, &comments);
        write_json(&mut self.info, url, &info)
    }
}

impl DiskEngine {
    pub(super) fn create_comment(&self, comment: &Comment) -> EngineResult<String> {
        check_new_comment(comment)?;
        let db = self.site_or_create(&comment.locator.site_id)?;
        let url = comment.locator.url.as_str();
        let id = comment.id.as_str();
        let now = Utc::now();

        let txn = db.begin_write()?;
        {
            let readonly = txn.open_table(Tables::READONLY)?;
            let mut infos = txn.open_table(Tables::INFO)?;
            let info: Option<PostInfo> = read_json(&infos, url)?;
            if readonly.get(url)?.is_some()
                || expired_by_age(info.as_ref(), self.read_only_age, now)
            {
                return Err(EngineError::ReadOnly(url.to_string()));
            }

            let mut posts = txn.open_table(Tables::POSTS)?;
            if posts.get((url, id))?.is_some() {
                return Err(EngineError::DuplicateId(id.to_string()));
            }
            posts.insert((url, id), encode(comment)?.as_slice())?;

            let key = time_key(&comment.timestamp);
            let reference = comment.reference().encode();
            let mut users = txn.open_table(Tables::USERS)?;
            users.insert(
                (comment.user.id.as_str(), key.as_str(), reference.as_str()),
                (),
            )?;

            let mut info = info.unwrap_or_else(|| PostInfo {
                count: 0,
                ..PostInfo::first(url, comment.timestamp)
            });
            if !comment.deleted {
                info.record(comment.timestamp);
                let mut last = txn.open_table(Tables::LAST)?;
                last.insert((key.as_str(), reference.as_str()), ())?;
            }
            write_json(&mut infos, url, &info)?;
        }
        txn.commit()?;

        tracing::debug!(site = %comment.locator.site_id, url, id, "comment created");
        Ok(comment.id.clone())
    }

    pub(super) fn get_comment(&self, req: &GetRequest) -> EngineResult<Comment> {
        let db = self.site(&req.locator.site_id)?;
        let txn = db.begin_read()?;
        let posts = txn.open_table(Tables::POSTS)?;
        load_comment(&posts, &req.locator.url, &req.comment_id)?.ok_or(EngineError::NotFound)
    }

    pub(super) fn update_comment(&self, comment: &Comment) -> EngineResult<()> {
        let db = self.site(&comment.locator.site_id)?;
        let url = comment.locator.url.as_str();

        let txn = db.begin_write()?;
        {
            let mut tables = PostTables::open(&txn)?;
            let stored = load_comment(&tables.posts, url, &comment.id)?.ok_or(EngineError::NotFound)?;
            let mut updated = comment.clone();
            updated.restore_immutable(&stored);
            tables
                .posts
                .insert((url, updated.id.as_str()), encode(&updated)?.as_slice())?;

            if stored.deleted != updated.deleted {
                let key = time_key(&updated.timestamp);
                let reference = updated.reference().encode();
                if updated.deleted {
                    tables.last.remove((key.as_str(), reference.as_str()))?;
                } else {
                    tables.last.insert((key.as_str(), reference.as_str()), ())?;
                }
                tables.recount(url)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub(super) fn find_comments(&self, req: &FindRequest) -> EngineResult<Vec<Comment>> {
        let db = self.site(&req.locator.site_id)?;
        let txn = db.begin_read()?;
        let posts = txn.open_table(Tables::POSTS)?;

        match FindMode::of(req) {
            FindMode::Post { url } => {
                let mut comments = post_comments(&posts, url)?;
                if let Some(since) = req.since {
                    comments.retain(|c| c.timestamp > since);
                }
                sort_comments(&mut comments, &req.sort);
                Ok(comments)
            }
            FindMode::Site { limit } => {
                let last = txn.open_table(Tables::LAST)?;
                let since = req.since.as_ref().map(time_key);
                let mut out = Vec::new();
                for item in last.iter()?.rev() {
                    let (key, _) = item?;
                    let (ts, raw) = key.value();
                    if since.as_deref().is_some_and(|since| ts <= since) {
                        break;
                    }
                    match resolve(&posts, raw)? {
                        Some(c) if !c.deleted => out.push(c),
                        _ => continue,
                    }
                    if out.len() >= limit {
                        break;
                    }
                }
                Ok(out)
            }
            FindMode::User { user_id, limit, skip } => {
                let users = txn.open_table(Tables::USERS)?;
                let index = user_index(&users, user_id)?;
                let mut out = Vec::new();
                for (_, raw) in index.iter().rev().skip(skip).take(limit) {
                    if let Some(c) = resolve(&posts, raw)? {
                        out.push(c);
                    }
                }
                Ok(out)
            }
        }
    }

    pub(super) fn count_comments(&self, req: &FindRequest) -> EngineResult<usize> {
        let db = self.site(&req.locator.site_id)?;
        let txn = db.begin_read()?;
        if !req.user_id.is_empty() {
            let users = txn.open_table(Tables::USERS)?;
            return Ok(user_index(&users, &req.user_id)?.len());
        }
        let posts = txn.open_table(Tables::POSTS)?;
        let comments = post_comments(&posts, &req.locator.url)?;
        Ok(comments.iter().filter(|c| !c.deleted).count())
    }

    pub(super) fn post_info(&self, req: &InfoRequest) -> EngineResult<Vec<PostInfo>> {
        let db = self.site(&req.locator.site_id)?;
        let txn = db.begin_read()?;
        let infos = txn.open_table(Tables::INFO)?;
        let readonly = txn.open_table(Tables::READONLY)?;
        let age = req.read_only_age.or(self.read_only_age);
        let now = Utc::now();

        let with_flag = |mut info: PostInfo| -> EngineResult<PostInfo> {
            info.read_only = readonly.get(info.url.as_str())?.is_some()
                || expired_by_age(Some(&info), age, now);
            Ok(info)
        };

        if req.locator.has_url() {
            let url = &req.locator.url;
            let info: PostInfo =
                read_json(&infos, url)?.ok_or_else(|| EngineError::PostNotFound(url.clone()))?;
            return Ok(vec![with_flag(info)?]);
        }

        let limit = clamp_limit(req.limit, DEFAULT_INFO_LIMIT);
        let mut out = Vec::new();
        for item in infos.iter()?.rev().skip(req.skip).take(limit) {
            let (_, value) = item?;
            out.push(with_flag(decode(value.value())?)?);
        }
        Ok(out)
    }
}
