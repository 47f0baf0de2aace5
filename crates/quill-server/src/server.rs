use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use quill_image::ImageStore;
use quill_store::{AdminStore, Engine};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{admin_methods, image_methods, store_methods, Handler, MethodTable};
use crate::router::build_router;

/// JSON-RPC server over registered method groups.
///
/// Register groups first, then [`run`](Self::run). Registration after the
/// server started is ignored.
pub struct RpcServer {
    config: ServerConfig,
    methods: RwLock<MethodTable>,
    running: AtomicBool,
    stop: watch::Sender<bool>,
    stopped: watch::Sender<bool>,
}

impl RpcServer {
    pub fn new(mut config: ServerConfig) -> Self {
        if !config.path.starts_with('/') {
            config.path.insert(0, '/');
        }
        Self {
            config,
            methods: RwLock::new(MethodTable::new()),
            running: AtomicBool::new(false),
            stop: watch::channel(false).0,
            stopped: watch::channel(false).0,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Add the methods of one group (`store`, `admin`, `image`).
    pub fn register<I>(&self, group: &str, methods: I)
    where
        I: IntoIterator<Item = (&'static str, Handler)>,
    {
        if self.running.load(Ordering::Acquire) {
            tracing::warn!(group, "rpc server already running, registration ignored");
            return;
        }
        let mut table = self.methods.write().expect("lock poisoned");
        let before = table.len();
        table.extend(methods.into_iter().map(|(name, h)| (name.to_string(), h)));
        tracing::debug!(group, methods = table.len() - before, "rpc group registered");
    }

    pub fn register_engine(&self, engine: Arc<dyn Engine>) {
        self.register(quill_protocol::methods::store::GROUP, store_methods(engine));
    }

    pub fn register_admin(&self, admins: Arc<dyn AdminStore>) {
        self.register(quill_protocol::methods::admin::GROUP, admin_methods(admins));
    }

    pub fn register_images(&self, images: Arc<dyn ImageStore>) {
        self.register(quill_protocol::methods::image::GROUP, image_methods(images));
    }

    /// Names of the registered methods, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.methods.read().expect("lock poisoned").keys().cloned().collect();
        names.sort();
        names
    }

    /// Router over a snapshot of the registered methods.
    pub fn router(&self) -> axum::Router {
        let methods = self.methods.read().expect("lock poisoned").clone();
        build_router(&self.config, Arc::new(methods))
    }

    /// Bind the configured address and serve until [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyRunning);
        }
        self.stop.send_replace(false);
        self.stopped.send_replace(false);
        let app = self.router();
        tracing::info!(%addr, path = %self.config.path, "rpc server listening");

        let mut stop = self.stop.subscribe();
        let mut deadline = self.stop.subscribe();
        let shutdown_timeout = self.config.shutdown_timeout;

        let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stop| *stop).await;
            })
            .into_future();

        let result = tokio::select! {
            served = server => served.map_err(ServerError::from),
            _ = async move {
                let _ = deadline.wait_for(|stop| *stop).await;
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::warn!(?shutdown_timeout, "shutdown timeout, dropping open connections");
                Ok(())
            }
        };

        self.running.store(false, Ordering::Release);
        self.stopped.send_replace(true);
        tracing::info!(%addr, "rpc server stopped");
        result
    }

    /// Stop accepting requests and wait for in-flight ones, bounded by the
    /// shutdown timeout.
    pub async fn shutdown(&self) -> ServerResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(ServerError::NotRunning);
        }
        let mut stopped = self.stopped.subscribe();
        self.stop.send_replace(true);
        let _ = stopped.wait_for(|stopped| *stopped).await;
        Ok(())
    }
}
