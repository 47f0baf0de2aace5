use quill_types::{UserDetail, UserDetailEntry, UserDetailRequest};
use redb::{Database, ReadableTable};

use super::{decode, read_json, write_json, DiskEngine};
use crate::error::EngineResult;
use crate::query::DetailOp;
use crate::tables::Tables;

impl DiskEngine {
    pub(super) fn user_details(&self, req: &UserDetailRequest) -> EngineResult<Vec<UserDetailEntry>> {
        let op = DetailOp::of(req)?;
        let db = match op {
            DetailOp::Set { .. } => self.site_or_create(&req.locator.site_id)?,
            _ => self.site(&req.locator.site_id)?,
        };
        match op {
            DetailOp::ListAll => {
                let txn = db.begin_read()?;
                let details = txn.open_table(Tables::USER_DETAILS)?;
                let mut out = Vec::new();
                for item in details.iter()? {
                    let (_, value) = item?;
                    out.push(decode(value.value())?);
                }
                Ok(out)
            }
            DetailOp::GetAll { user_id } => Ok(read_entry(&db, user_id)?.into_iter().collect()),
            DetailOp::Get { user_id, detail } => Ok(read_entry(&db, user_id)?
                .filter(|entry| entry.get(detail).is_some())
                .map(|entry| entry.only(detail))
                .into_iter()
                .collect()),
            DetailOp::Set { user_id, detail, value } => {
                set_detail(&db, user_id, detail, value)?;
                let mut out = UserDetailEntry::new(user_id);
                out.set(detail, value);
                Ok(vec![out])
            }
        }
    }
}

fn read_entry(db: &Database, user_id: &str) -> EngineResult<Option<UserDetailEntry>> {
    let txn = db.begin_read()?;
    let details = txn.open_table(Tables::USER_DETAILS)?;
    read_json(&details, user_id)
}

/// Set one field (`All` clears every field). Entries left empty are removed.
pub(super) fn set_detail(db: &Database, user_id: &str, detail: UserDetail, value: &str) -> EngineResult<()> {
    let txn = db.begin_write()?;
    {
        let mut details = txn.open_table(Tables::USER_DETAILS)?;
        let mut entry: UserDetailEntry =
            read_json(&details, user_id)?.unwrap_or_else(|| UserDetailEntry::new(user_id));
        entry.set(detail, value);
        if entry.is_empty() {
            details.remove(user_id)?;
        } else {
            write_json(&mut details, user_id, &entry)?;
        }
    }
    txn.commit()?;
    Ok(())
}
