/// Default URL path of the RPC endpoint.
pub const DEFAULT_PATH: &str = "/v1/rpc";

/// Method names, `<group>.<name>`.
pub mod methods {
    pub mod store {
        pub const GROUP: &str = "store";
        pub const CREATE: &str = "store.create";
        pub const GET: &str = "store.get";
        pub const UPDATE: &str = "store.update";
        pub const FIND: &str = "store.find";
        pub const COUNT: &str = "store.count";
        pub const INFO: &str = "store.info";
        pub const FLAG: &str = "store.flag";
        pub const LIST_FLAGS: &str = "store.list_flags";
        pub const USER_DETAIL: &str = "store.user_detail";
        pub const DELETE: &str = "store.delete";
        pub const CLOSE: &str = "store.close";
    }

    pub mod admin {
        pub const GROUP: &str = "admin";
        pub const KEY: &str = "admin.key";
        pub const ADMINS: &str = "admin.admins";
        pub const EMAIL: &str = "admin.email";
        pub const ENABLED: &str = "admin.enabled";
        pub const EVENT: &str = "admin.event";
    }

    pub mod image {
        pub const GROUP: &str = "image";
        pub const SAVE_WITH_ID: &str = "image.save_with_id";
        pub const LOAD: &str = "image.load";
        pub const COMMIT: &str = "image.commit";
        pub const CLEANUP: &str = "image.cleanup";
        pub const RESET_CLEANUP_TIMER: &str = "image.reset_cleanup_timer";
        pub const INFO: &str = "image.info";
    }

    /// Group part of a method name.
    pub fn group(method: &str) -> Option<&str> {
        method.split_once('.').map(|(group, _)| group).filter(|g| !g.is_empty())
    }
}
