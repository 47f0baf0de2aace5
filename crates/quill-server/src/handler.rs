use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use quill_image::ImageStore;
use quill_protocol::methods::{admin, image, store};
use quill_protocol::RpcCodec;
use quill_store::{AdminStore, Engine};
use quill_types::{
    Comment, DeleteRequest, EventKind, FindRequest, FlagRequest, GetRequest, InfoRequest,
    UserDetailRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A registered RPC method: JSON params in, JSON result or error string out.
/// Runs on a blocking thread.
pub type Handler = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Method name -> handler.
pub type MethodTable = HashMap<String, Handler>;

/// Wrap a typed function as a [`Handler`].
pub fn handler<P, R, E, F>(f: F) -> Handler
where
    P: DeserializeOwned,
    R: Serialize,
    E: Display,
    F: Fn(P) -> Result<R, E> + Send + Sync + 'static,
{
    Arc::new(move |params| {
        let params = RpcCodec::from_value::<P>(params).map_err(|e| e.to_string())?;
        let result = f(params).map_err(|e| e.to_string())?;
        RpcCodec::to_value(&result).map_err(|e| e.to_string())
    })
}

/// Bind a method of a shared target.
fn bind<T, P, R, E, F>(target: &Arc<T>, call: F) -> Handler
where
    T: ?Sized + Send + Sync + 'static,
    P: DeserializeOwned,
    R: Serialize,
    E: Display,
    F: Fn(&T, P) -> Result<R, E> + Send + Sync + 'static,
{
    let target = Arc::clone(target);
    handler(move |params: P| call(&target, params))
}

/// The `store.*` group.
pub fn store_methods(engine: Arc<dyn Engine>) -> Vec<(&'static str, Handler)> {
    vec![
        (store::CREATE, bind(&engine, |e, c: Comment| e.create(&c))),
        (store::GET, bind(&engine, |e, r: GetRequest| e.get(&r))),
        (store::UPDATE, bind(&engine, |e, c: Comment| e.update(&c))),
        (store::FIND, bind(&engine, |e, r: FindRequest| e.find(&r))),
        (store::COUNT, bind(&engine, |e, r: FindRequest| e.count(&r))),
        (store::INFO, bind(&engine, |e, r: InfoRequest| e.info(&r))),
        (store::FLAG, bind(&engine, |e, r: FlagRequest| e.flag(&r))),
        (store::LIST_FLAGS, bind(&engine, |e, r: FlagRequest| e.list_flags(&r))),
        (store::USER_DETAIL, bind(&engine, |e, r: UserDetailRequest| e.user_detail(&r))),
        (store::DELETE, bind(&engine, |e, r: DeleteRequest| e.delete(&r))),
        (store::CLOSE, bind(&engine, |e, (): ()| e.close())),
    ]
}

/// The `admin.*` group.
pub fn admin_methods(admins: Arc<dyn AdminStore>) -> Vec<(&'static str, Handler)> {
    vec![
        (admin::KEY, bind(&admins, |a, site: String| a.key(&site))),
        (admin::ADMINS, bind(&admins, |a, site: String| a.admins(&site))),
        (admin::EMAIL, bind(&admins, |a, site: String| a.email(&site))),
        (admin::ENABLED, bind(&admins, |a, site: String| a.enabled(&site))),
        (
            admin::EVENT,
            bind(&admins, |a, (site, event): (String, EventKind)| a.on_event(&site, event)),
        ),
    ]
}

/// The `image.*` group. Image bytes travel as base64.
pub fn image_methods(images: Arc<dyn ImageStore>) -> Vec<(&'static str, Handler)> {
    vec![
        (
            image::SAVE_WITH_ID,
            bind(&images, |s, (id, data): (String, String)| -> Result<(), String> {
                let data = RpcCodec::decode_bytes(&data).map_err(|e| e.to_string())?;
                s.save(&id, &data).map_err(|e| e.to_string())
            }),
        ),
        (
            image::LOAD,
            bind(&images, |s, id: String| s.load(&id).map(|data| RpcCodec::encode_bytes(&data))),
        ),
        (image::COMMIT, bind(&images, |s, id: String| s.commit(&id))),
        (
            image::CLEANUP,
            bind(&images, |s, ttl_ns: u64| s.cleanup(Duration::from_nanos(ttl_ns))),
        ),
        (
            image::RESET_CLEANUP_TIMER,
            bind(&images, |s, id: String| s.reset_cleanup_timer(&id)),
        ),
        (image::INFO, bind(&images, |s, (): ()| s.info())),
    ]
}
