use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ImageError, ImageResult};
use crate::html;
use crate::service::ImageService;

/// Settings of the picture preserver.
#[derive(Clone, Debug)]
pub struct PreserverConfig {
    /// Public base URL of the site, prepended to the image API path.
    pub base_url: String,
    pub timeout: Duration,
    pub attempts: u32,
    /// Delay before the second attempt, doubled after every failure.
    pub backoff: Duration,
}

impl Default for PreserverConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            attempts: 5,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Copies externally hosted pictures into the image store and points the
/// comment at the local copy.
pub struct Preserver {
    service: Arc<ImageService>,
    client: reqwest::Client,
    config: PreserverConfig,
}

impl Preserver {
    pub fn new(service: Arc<ImageService>, config: PreserverConfig) -> Self {
        Self {
            service,
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Download every external `<img>` of `html` for `user_id` and rewrite
    /// its source. Pictures that can't be fetched or saved keep their URL.
    pub async fn preserve(&self, user_id: &str, html: &str) -> String {
        let api = self.service.config().image_api.clone();
        let mut replacements = HashMap::new();

        for source in html::img_sources(html) {
            let src = source.src;
            if src.contains(api.as_str()) || !is_remote(src) || replacements.contains_key(src) {
                continue;
            }
            match self.store(user_id, src).await {
                Ok(id) => {
                    let local = format!("{}{}{}", self.config.base_url, api, id);
                    tracing::debug!(from = %src, to = %local, "picture preserved");
                    replacements.insert(src.to_string(), local);
                }
                Err(err) => tracing::warn!(url = %src, error = %err, "can't preserve picture"),
            }
        }

        html::replace_sources(html, &replacements)
    }

    async fn store(&self, user_id: &str, url: &str) -> ImageResult<String> {
        let data = self.download(url).await?;
        let service = Arc::clone(&self.service);
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || service.save(&user_id, data))
            .await
            .map_err(|err| ImageError::Download {
                url: url.to_string(),
                reason: err.to_string(),
            })?
    }

    async fn download(&self, url: &str) -> ImageResult<Vec<u8>> {
        let attempts = self.config.attempts.max(1);
        let mut delay = self.config.backoff;
        let mut reason = String::new();

        for attempt in 1..=attempts {
            match self.fetch(url).await {
                Ok(data) => return Ok(data),
                Err(err) => {
                    tracing::debug!(url, attempt, error = %err, "picture download failed");
                    reason = err.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(ImageError::Download {
            url: url.to_string(),
            reason,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}
