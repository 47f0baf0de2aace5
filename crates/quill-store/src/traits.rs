use quill_types::{
    Comment, DeleteRequest, FindRequest, FlagRequest, FlaggedUser, GetRequest, InfoRequest,
    PostInfo, UserDetailEntry, UserDetailRequest,
};

use crate::error::EngineResult;

/// Comment storage engine.
///
/// All implementations must satisfy these invariants:
/// - A comment id is unique within its post; `create` refuses duplicates.
/// - `update` never changes id, parent id, locator or creation time.
/// - Soft-deleted comments stay visible in post and user listings but are
///   excluded from site-wide listings and post counters.
/// - Post info counters only count live comments.
/// - Operations on a site the engine does not know fail with
///   [`EngineError::SiteNotFound`](crate::EngineError::SiteNotFound).
pub trait Engine: Send + Sync {
    /// Store a new comment and return its id.
    ///
    /// Fails with `ReadOnly` when the post is flagged read-only or older than
    /// the configured read-only age.
    fn create(&self, comment: &Comment) -> EngineResult<String>;

    /// Fetch one comment. Missing comments fail with `NotFound`.
    fn get(&self, req: &GetRequest) -> EngineResult<Comment>;

    /// Replace the mutable fields of a stored comment.
    fn update(&self, comment: &Comment) -> EngineResult<()>;

    /// Comments of a post, the newest comments of a site, or a page of a
    /// user's comments, depending on the request.
    fn find(&self, req: &FindRequest) -> EngineResult<Vec<Comment>>;

    /// Live comments of a post, or every comment of a user.
    fn count(&self, req: &FindRequest) -> EngineResult<usize>;

    /// Info of one post, or a page of posts of the site.
    fn info(&self, req: &InfoRequest) -> EngineResult<Vec<PostInfo>>;

    /// Read or change a flag. Returns the state after the request.
    fn flag(&self, req: &FlagRequest) -> EngineResult<bool>;

    /// Users currently carrying a listable flag.
    fn list_flags(&self, req: &FlagRequest) -> EngineResult<Vec<FlaggedUser>>;

    /// Read, change or list user details.
    fn user_detail(&self, req: &UserDetailRequest) -> EngineResult<Vec<UserDetailEntry>>;

    /// Delete a comment, a user, a user detail or a whole site.
    fn delete(&self, req: &DeleteRequest) -> EngineResult<()>;

    /// Release underlying resources. Later calls may fail.
    fn close(&self) -> EngineResult<()>;
}
