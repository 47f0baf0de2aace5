use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{ImageError, ImageResult};
use crate::html;
use crate::traits::{ImageStore, StoreInfo};

/// Capacity of the commit queue.
pub const COMMIT_QUEUE_SIZE: usize = 5000;

/// Bytes inspected when sniffing the image format.
const SNIFF_LEN: usize = 512;

/// Image service settings.
#[derive(Clone, Debug)]
pub struct ImageServiceConfig {
    /// URL path prefix under which images are served, e.g. `/api/v1/picture/`.
    pub image_api: String,
    /// Lifetime of uncommitted images.
    pub ttl: Duration,
    /// Largest accepted upload in bytes.
    pub max_size: usize,
    /// Bounding box for stored images; zero disables resizing.
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            image_api: "/api/v1/picture/".to_string(),
            ttl: Duration::from_secs(15 * 60),
            max_size: 5_000_000,
            max_width: 2400,
            max_height: 900,
        }
    }
}

type IdsFn = Box<dyn FnOnce() -> Vec<String> + Send>;

struct Submission {
    ids: IdsFn,
    enqueued_at: Instant,
}

struct Worker {
    queue: mpsc::Sender<Submission>,
    handle: JoinHandle<()>,
}

/// Front of an [`ImageStore`]: validation, resizing, delayed commits and
/// periodic cleanup of stale uploads.
pub struct ImageService {
    store: Arc<dyn ImageStore>,
    config: ImageServiceConfig,
    worker: Mutex<Option<Worker>>,
    closed: AtomicBool,
    drain: watch::Sender<bool>,
}

impl ImageService {
    pub fn new(store: Arc<dyn ImageStore>, config: ImageServiceConfig) -> Self {
        let (drain, _) = watch::channel(false);
        Self {
            store,
            config,
            worker: Mutex::new(None),
            closed: AtomicBool::new(false),
            drain,
        }
    }

    pub fn config(&self) -> &ImageServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }

    /// Validate and stage an upload, returning its generated id
    /// `<user>/<uuid>.<ext>`.
    pub fn save(&self, user_id: &str, data: Vec<u8>) -> ImageResult<String> {
        if data.len() > self.config.max_size {
            return Err(ImageError::TooLarge);
        }
        let format = sniff_format(&data)?;
        let (data, format) = self.resize(data, format);

        let ext = format.extensions_str().first().copied().unwrap_or("png");
        let id = format!("{}/{}.{}", user_id, Uuid::now_v7().simple(), ext);
        self.store.save(&id, &data)?;
        tracing::debug!(id = %id, size = data.len(), "image saved");
        Ok(id)
    }

    pub fn save_with_id(&self, id: &str, data: &[u8]) -> ImageResult<()> {
        self.store.save(id, data)
    }

    pub fn load(&self, id: &str) -> ImageResult<Vec<u8>> {
        self.store.load(id)
    }

    pub fn commit(&self, id: &str) -> ImageResult<()> {
        self.store.commit(id)
    }

    pub fn reset_cleanup_timer(&self, id: &str) -> ImageResult<()> {
        self.store.reset_cleanup_timer(id)
    }

    pub fn info(&self) -> ImageResult<StoreInfo> {
        self.store.info()
    }

    /// Ids of pictures served by this service that appear in `html`, in
    /// document order without duplicates.
    pub fn extract_pictures(&self, html: &str) -> Vec<String> {
        let api = self.config.image_api.as_str();
        let mut ids: Vec<String> = Vec::new();
        for src in html::sources_with_prefix(html, api) {
            let Some((_, tail)) = src.split_once(api) else {
                continue;
            };
            let id = tail.split(['?', '#']).next().unwrap_or_default();
            if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    /// Queue a delayed commit. `ids` runs once the submission is ready, half
    /// a TTL after enqueueing, and every id it returns is committed.
    ///
    /// Never blocks: a full queue drops the submission with a warning.
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, ids: F)
    where
        F: FnOnce() -> Vec<String> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!("image service is shut down, submission dropped");
            return;
        }

        let mut worker = self.worker.lock().expect("lock poisoned");
        // shutdown flips `closed` before taking the worker under this lock
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!("image service is shut down, submission dropped");
            return;
        }
        if worker.is_none() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => *worker = Some(self.start_worker(&runtime)),
                Err(err) => {
                    tracing::warn!(error = %err, "no runtime for commit worker, submission dropped");
                    return;
                }
            }
        }

        let Some(worker) = worker.as_ref() else {
            return;
        };
        let submission = Submission {
            ids: Box::new(ids),
            enqueued_at: Instant::now(),
        };
        if let Err(err) = worker.queue.try_send(submission) {
            tracing::warn!(error = %err, "commit queue rejected submission");
        }
    }

    fn start_worker(&self, runtime: &tokio::runtime::Handle) -> Worker {
        let (queue, rx) = mpsc::channel(COMMIT_QUEUE_SIZE);
        let handle = runtime.spawn(commit_worker(
            Arc::clone(&self.store),
            self.config.ttl / 2,
            rx,
            self.drain.subscribe(),
        ));
        tracing::debug!("image commit worker started");
        Worker { queue, handle }
    }

    /// Commit everything still queued without waiting for readiness, then
    /// stop the worker.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.drain.send_replace(true);

        let worker = self.worker.lock().expect("lock poisoned").take();
        let Some(Worker { queue, handle }) = worker else {
            return;
        };
        drop(queue);
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "image commit worker failed");
        }
        tracing::info!("image service stopped");
    }

    /// Remove stale staged images every `ttl / 2` until `shutdown` turns true.
    pub async fn run_cleanup(&self, mut shutdown: watch::Receiver<bool>) {
        let ttl = self.config.ttl;
        let period = (ttl / 2).max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        tracing::info!(?period, "image cleanup started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let store = Arc::clone(&self.store);
                    match tokio::task::spawn_blocking(move || store.cleanup(ttl)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => tracing::warn!(error = %err, "image cleanup failed"),
                        Err(err) => tracing::warn!(error = %err, "image cleanup task failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("image cleanup stopped");
    }

    fn resize(&self, data: Vec<u8>, format: ImageFormat) -> (Vec<u8>, ImageFormat) {
        let (max_w, max_h) = (self.config.max_width, self.config.max_height);
        if max_w == 0 || max_h == 0 {
            return (data, format);
        }

        let img = match image::load_from_memory_with_format(&data, format) {
            Ok(img) => img,
            Err(err) => {
                tracing::debug!(error = %err, "can't decode image, stored as is");
                return (data, format);
            }
        };
        let (w, h) = img.dimensions();
        if w <= max_w && h <= max_h {
            return (data, format);
        }

        let resized = img.resize(max_w, max_h, FilterType::Triangle);
        let mut out = Cursor::new(Vec::new());
        match resized.write_to(&mut out, ImageFormat::Png) {
            Ok(()) => {
                tracing::debug!(from = ?(w, h), to = ?resized.dimensions(), "image resized");
                (out.into_inner(), ImageFormat::Png)
            }
            Err(err) => {
                tracing::debug!(error = %err, "can't encode resized image, stored as is");
                (data, format)
            }
        }
    }
}

async fn commit_worker(
    store: Arc<dyn ImageStore>,
    delay: Duration,
    mut queue: mpsc::Receiver<Submission>,
    mut drain: watch::Receiver<bool>,
) {
    while let Some(submission) = queue.recv().await {
        if !*drain.borrow() {
            tokio::select! {
                _ = tokio::time::sleep_until(submission.enqueued_at + delay) => {}
                _ = drain.wait_for(|draining| *draining) => {}
            }
        }

        let store = Arc::clone(&store);
        let ids = submission.ids;
        let committed = tokio::task::spawn_blocking(move || {
            for id in ids() {
                if let Err(err) = store.commit(&id) {
                    tracing::warn!(id = %id, error = %err, "can't commit image");
                }
            }
        })
        .await;
        if let Err(err) = committed {
            tracing::warn!(error = %err, "image commit batch failed");
        }
    }
    tracing::debug!("image commit worker finished");
}

fn sniff_format(data: &[u8]) -> ImageResult<ImageFormat> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    match image::guess_format(head) {
        Ok(format @ (ImageFormat::Gif | ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => {
            Ok(format)
        }
        _ => Err(ImageError::FormatNotAllowed),
    }
}
