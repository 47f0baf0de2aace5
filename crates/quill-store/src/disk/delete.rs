use quill_types::{CommentRef, DeleteMode, DeleteRequest};
use redb::WriteTransaction;

use super::comments::PostTables;
use super::details::set_detail;
use super::{user_index, DiskEngine};
use crate::error::{EngineError, EngineResult};
use crate::tables::Tables;

/// Drop and recreate tables, leaving them empty.
macro_rules! reset_tables {
    ($txn:expr, $($table:expr),+ $(,)?) => {
        $(
            $txn.delete_table($table)?;
            $txn.open_table($table)?;
        )+
    };
}

impl DiskEngine {
    pub(super) fn delete_in_site(&self, req: &DeleteRequest) -> EngineResult<()> {
        let db = self.site(req.site_id())?;
        match req {
            DeleteRequest::Comment { locator, comment_id, mode } => {
                let txn = db.begin_write()?;
                PostTables::open(&txn)?.delete_comment(&locator.url, comment_id, *mode)?;
                txn.commit()?;
            }
            DeleteRequest::User { site_id, user_id, mode } => {
                let txn = db.begin_write()?;
                let deleted = delete_user(&txn, user_id, *mode)?;
                txn.commit()?;
                tracing::info!(site = %site_id, user = %user_id, ?mode, comments = deleted, "user deleted");
            }
            DeleteRequest::UserDetail { user_id, detail, .. } => {
                set_detail(&db, user_id, *detail, "")?;
            }
            DeleteRequest::Site { site_id } => {
                let txn = db.begin_write()?;
                reset_tables!(
                    txn,
                    Tables::POSTS,
                    Tables::LAST,
                    Tables::USERS,
                    Tables::USER_DETAILS,
                    Tables::INFO,
                    Tables::READONLY,
                    Tables::VERIFIED,
                );
                txn.commit()?;
                tracing::info!(site = %site_id, "site wiped");
            }
        }
        Ok(())
    }
}

/// Delete every comment of a user and their details. Hard mode also drops
/// the user's index rows. Returns the number of comments touched.
fn delete_user(txn: &WriteTransaction, user_id: &str, mode: DeleteMode) -> EngineResult<usize> {
    let index = {
        let users = txn.open_table(Tables::USERS)?;
        user_index(&users, user_id)?
    };

    {
        let mut tables = PostTables::open(txn)?;
        for (_, raw) in &index {
            let r = CommentRef::parse(raw)?;
            match tables.delete_comment(&r.url, &r.id, mode) {
                Err(EngineError::NotFound) => {
                    tracing::warn!(reference = %raw, "skipping missing comment of user");
                }
                other => other?,
            }
        }
    }

    {
        let mut details = txn.open_table(Tables::USER_DETAILS)?;
        details.remove(user_id)?;
    }

    if mode == DeleteMode::Hard {
        let mut users = txn.open_table(Tables::USERS)?;
        for (ts, raw) in &index {
            users.remove((user_id, ts.as_str(), raw.as_str()))?;
        }
    }
    Ok(index.len())
}
