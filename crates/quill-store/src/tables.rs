//! Table definitions of a site database.
//!
//! Every site lives in its own redb file. Composite keys use redb tuples so
//! that range scans over a post or a user stay inside one table.

use redb::TableDefinition;

/// `(url, comment id)`.
pub type PostKey = (&'static str, &'static str);
/// `(time key, encoded reference)`.
pub type TimeIndexKey = (&'static str, &'static str);
/// `(user id, time key, encoded reference)`.
pub type UserIndexKey = (&'static str, &'static str, &'static str);
pub type Bytes = &'static [u8];

/// Table definitions for site storage.
pub struct Tables;

impl Tables {
    /// Comments: (url, comment id) -> JSON comment
    pub const POSTS: TableDefinition<'static, PostKey, Bytes> = TableDefinition::new("posts");

    /// Live comments of the site in time order: (time key, reference) -> ()
    pub const LAST: TableDefinition<'static, TimeIndexKey, ()> = TableDefinition::new("last");

    /// Every comment of a user in time order: (user, time key, reference) -> ()
    pub const USERS: TableDefinition<'static, UserIndexKey, ()> = TableDefinition::new("users");

    /// User details: user id -> JSON entry
    pub const USER_DETAILS: TableDefinition<'static, &'static str, Bytes> =
        TableDefinition::new("user_details");

    /// Blocked users: user id -> time key of block expiry
    pub const BLOCKS: TableDefinition<'static, &'static str, &'static str> =
        TableDefinition::new("blocks");

    /// Post info: url -> JSON info
    pub const INFO: TableDefinition<'static, &'static str, Bytes> = TableDefinition::new("info");

    /// Read-only posts: url -> time key of when the flag was set
    pub const READONLY: TableDefinition<'static, &'static str, &'static str> =
        TableDefinition::new("readonly");

    /// Verified users: user id -> time key of when the flag was set
    pub const VERIFIED: TableDefinition<'static, &'static str, &'static str> =
        TableDefinition::new("verified");
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::TableHandle;

    #[test]
    fn table_names_are_unique() {
        let names = [
            Tables::POSTS.name(),
            Tables::LAST.name(),
            Tables::USERS.name(),
            Tables::USER_DETAILS.name(),
            Tables::BLOCKS.name(),
            Tables::INFO.name(),
            Tables::READONLY.name(),
            Tables::VERIFIED.name(),
        ];
        let mut sorted = names.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }
}
