use std::sync::Arc;
use std::time::Duration;

use quill_image::{ImageResult, ImageStore, StoreInfo};
use quill_protocol::methods::{admin, image, store};
use quill_protocol::RpcCodec;
use quill_store::{AdminStore, Engine, EngineResult};
use quill_types::{
    Comment, DeleteRequest, EventKind, FindRequest, FlagRequest, FlaggedUser, GetRequest,
    InfoRequest, PostInfo, UserDetailEntry, UserDetailRequest,
};

use crate::rpc::RpcClient;

/// [`Engine`] served by a remote process.
#[derive(Clone, Debug)]
pub struct RemoteEngine {
    client: Arc<RpcClient>,
}

impl RemoteEngine {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

impl Engine for RemoteEngine {
    fn create(&self, comment: &Comment) -> EngineResult<String> {
        Ok(self.client.call(store::CREATE, comment)?)
    }

    fn get(&self, req: &GetRequest) -> EngineResult<Comment> {
        Ok(self.client.call(store::GET, req)?)
    }

    fn update(&self, comment: &Comment) -> EngineResult<()> {
        Ok(self.client.call(store::UPDATE, comment)?)
    }

    fn find(&self, req: &FindRequest) -> EngineResult<Vec<Comment>> {
        Ok(self.client.call(store::FIND, req)?)
    }

    fn count(&self, req: &FindRequest) -> EngineResult<usize> {
        Ok(self.client.call(store::COUNT, req)?)
    }

    fn info(&self, req: &InfoRequest) -> EngineResult<Vec<PostInfo>> {
        Ok(self.client.call(store::INFO, req)?)
    }

    fn flag(&self, req: &FlagRequest) -> EngineResult<bool> {
        Ok(self.client.call(store::FLAG, req)?)
    }

    fn list_flags(&self, req: &FlagRequest) -> EngineResult<Vec<FlaggedUser>> {
        Ok(self.client.call(store::LIST_FLAGS, req)?)
    }

    fn user_detail(&self, req: &UserDetailRequest) -> EngineResult<Vec<UserDetailEntry>> {
        Ok(self.client.call(store::USER_DETAIL, req)?)
    }

    fn delete(&self, req: &DeleteRequest) -> EngineResult<()> {
        Ok(self.client.call(store::DELETE, req)?)
    }

    fn close(&self) -> EngineResult<()> {
        Ok(self.client.call(store::CLOSE, ())?)
    }
}

/// [`AdminStore`] served by a remote process.
#[derive(Clone, Debug)]
pub struct RemoteAdminStore {
    client: Arc<RpcClient>,
}

impl RemoteAdminStore {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

impl AdminStore for RemoteAdminStore {
    fn key(&self, site_id: &str) -> EngineResult<String> {
        Ok(self.client.call(admin::KEY, site_id)?)
    }

    fn admins(&self, site_id: &str) -> EngineResult<Vec<String>> {
        Ok(self.client.call(admin::ADMINS, site_id)?)
    }

    fn email(&self, site_id: &str) -> EngineResult<String> {
        Ok(self.client.call(admin::EMAIL, site_id)?)
    }

    fn enabled(&self, site_id: &str) -> EngineResult<bool> {
        Ok(self.client.call(admin::ENABLED, site_id)?)
    }

    fn on_event(&self, site_id: &str, event: EventKind) -> EngineResult<()> {
        Ok(self.client.call(admin::EVENT, (site_id, event))?)
    }
}

/// [`ImageStore`] served by a remote process.
#[derive(Clone, Debug)]
pub struct RemoteImageStore {
    client: Arc<RpcClient>,
}

impl RemoteImageStore {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

impl ImageStore for RemoteImageStore {
    fn save(&self, id: &str, data: &[u8]) -> ImageResult<()> {
        Ok(self.client.call(image::SAVE_WITH_ID, (id, RpcCodec::encode_bytes(data)))?)
    }

    fn commit(&self, id: &str) -> ImageResult<()> {
        Ok(self.client.call(image::COMMIT, id)?)
    }

    fn load(&self, id: &str) -> ImageResult<Vec<u8>> {
        let encoded: String = self.client.call(image::LOAD, id)?;
        RpcCodec::decode_bytes(&encoded).map_err(|e| quill_image::ImageError::Remote(e.to_string()))
    }

    fn reset_cleanup_timer(&self, id: &str) -> ImageResult<()> {
        Ok(self.client.call(image::RESET_CLEANUP_TIMER, id)?)
    }

    fn cleanup(&self, ttl: Duration) -> ImageResult<()> {
        let ttl_ns = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        Ok(self.client.call(image::CLEANUP, ttl_ns)?)
    }

    fn info(&self) -> ImageResult<StoreInfo> {
        Ok(self.client.call(image::INFO, ())?)
    }
}
