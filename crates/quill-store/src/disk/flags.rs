use chrono::{DateTime, Utc};
use quill_types::{parse_time_key, time_key, BlockedUser, Flag, FlagRequest, FlaggedUser};
use redb::ReadableTable;

use super::{resolve, user_index, DiskEngine};
use crate::error::{EngineError, EngineResult};
use crate::query::{block_until, check_flag_target};
use crate::tables::{Bytes, PostKey, Tables, UserIndexKey};

fn stored_time(raw: &str) -> EngineResult<DateTime<Utc>> {
    parse_time_key(raw).map_err(|e| EngineError::Serialization(e.to_string()))
}

impl DiskEngine {
    pub(super) fn set_or_read_flag(&self, req: &FlagRequest) -> EngineResult<bool> {
        check_flag_target(req)?;
        let db = match req.update {
            Some(_) => self.site_or_create(&req.locator.site_id)?,
            None => self.site(&req.locator.site_id)?,
        };
        let now = Utc::now();
        let (table, key) = match req.flag {
            Flag::ReadOnly => (Tables::READONLY, req.locator.url.as_str()),
            Flag::Blocked => (Tables::BLOCKS, req.user_id.as_str()),
            Flag::Verified => (Tables::VERIFIED, req.user_id.as_str()),
        };

        let Some(value) = req.update else {
            let txn = db.begin_read()?;
            let table = txn.open_table(table)?;
            let Some(stamp) = table.get(key)? else {
                return Ok(false);
            };
            if req.flag == Flag::Blocked {
                return Ok(now < stored_time(stamp.value())?);
            }
            return Ok(true);
        };

        let txn = db.begin_write()?;
        {
            let mut table = txn.open_table(table)?;
            if value {
                let stamp = match req.flag {
                    Flag::Blocked => block_until(now, req.ttl),
                    _ => now,
                };
                table.insert(key, time_key(&stamp).as_str())?;
            } else {
                table.remove(key)?;
            }
        }
        txn.commit()?;

        tracing::debug!(site = %req.locator.site_id, flag = %req.flag, key, value, "flag changed");
        Ok(value)
    }

    pub(super) fn flagged_users(&self, req: &FlagRequest) -> EngineResult<Vec<FlaggedUser>> {
        let db = self.site(&req.locator.site_id)?;
        let txn = db.begin_read()?;
        match req.flag {
            Flag::Verified => {
                let verified = txn.open_table(Tables::VERIFIED)?;
                let mut out = Vec::new();
                for item in verified.iter()? {
                    let (key, _) = item?;
                    out.push(FlaggedUser::Verified(key.value().to_string()));
                }
                Ok(out)
            }
            Flag::Blocked => {
                let blocks = txn.open_table(Tables::BLOCKS)?;
                let users = txn.open_table(Tables::USERS)?;
                let posts = txn.open_table(Tables::POSTS)?;
                let now = Utc::now();
                let mut out = Vec::new();
                for item in blocks.iter()? {
                    let (key, value) = item?;
                    let until = stored_time(value.value())?;
                    if until <= now {
                        continue;
                    }
                    let id = key.value();
                    out.push(FlaggedUser::Blocked(BlockedUser {
                        id: id.to_string(),
                        name: newest_name(&users, &posts, id)?,
                        until,
                    }));
                }
                Ok(out)
            }
            Flag::ReadOnly => Err(EngineError::FlagNotListable(req.flag.to_string())),
        }
    }
}

/// Name of the user as of their most recent comment.
fn newest_name<U, P>(users: &U, posts: &P, user_id: &str) -> EngineResult<String>
where
    U: ReadableTable<UserIndexKey, ()>,
    P: ReadableTable<PostKey, Bytes>,
{
    for (_, raw) in user_index(users, user_id)?.iter().rev() {
        if let Some(comment) = resolve(posts, raw)? {
            return Ok(comment.user.name);
        }
    }
    Ok(String::new())
}
