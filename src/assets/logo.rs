use std::{
    io::Cursor,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::Context as _;
use futures::future::{BoxFuture, FutureExt as _, Shared};
use parking_lot::Mutex;

use crate::assets::decode::{decode_image, to_data_uri};
use crate::foundation::error::{TicketError, TicketResult};

/// Fixed reference of the logo resource.
pub const LOGO_PATH: &str = "/logo1.webp";

const FALLBACK_SIZE: u32 = 100;

/// Byte source for the logo.
#[async_trait::async_trait]
pub trait LogoSource: Send + Sync {
    /// Fetch the raw encoded logo bytes.
    async fn fetch(&self) -> anyhow::Result<Vec<u8>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Logo read from the local filesystem.
#[derive(Clone, Debug)]
pub struct FileLogoSource {
    path: PathBuf,
}

impl FileLogoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl LogoSource for FileLogoSource {
    async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("read logo '{}'", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Logo fetched over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpLogoSource {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpLogoSource {
    pub fn new(client: reqwest::Client, url: reqwest::Url) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl LogoSource for HttpLogoSource {
    async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()
            .with_context(|| format!("GET {}", self.url))?;
        let bytes = resp.bytes().await.context("read logo body")?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Build the source for a configured logo location (`http(s)://` URL or filesystem path).
pub fn logo_source_for(location: &str, client: reqwest::Client) -> Arc<dyn LogoSource> {
    match reqwest::Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Arc::new(HttpLogoSource::new(client, url))
        }
        _ => Arc::new(FileLogoSource::new(location)),
    }
}

/// A usable logo image, embedded as a PNG `data:` URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoAsset {
    data_uri: Arc<str>,
    width: u32,
    height: u32,
    fallback: bool,
}

impl LogoAsset {
    /// Decode fetched bytes into an embeddable asset.
    pub fn from_bytes(bytes: &[u8]) -> TicketResult<Self> {
        let decoded = decode_image(bytes)
            .map_err(|e| TicketError::asset_load(format!("logo decode failed: {e}")))?;
        Ok(Self {
            data_uri: Arc::from(to_data_uri("image/png", &decoded.png)),
            width: decoded.width,
            height: decoded.height,
            fallback: false,
        })
    }

    /// Deterministic placeholder used whenever the real logo cannot be obtained.
    pub fn fallback() -> Self {
        let img = image::RgbaImage::from_fn(FALLBACK_SIZE, FALLBACK_SIZE, |x, y| {
            let edge = x < 4 || y < 4 || x >= FALLBACK_SIZE - 4 || y >= FALLBACK_SIZE - 4;
            if edge {
                image::Rgba([29, 78, 216, 255])
            } else {
                image::Rgba([226, 232, 240, 255])
            }
        });
        let mut png = Vec::new();
        // Encoding a fixed in-memory RGBA buffer only fails on allocation failure.
        if let Err(e) = image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        {
            tracing::error!(error = %e, "fallback logo encode failed");
        }
        Self {
            data_uri: Arc::from(to_data_uri("image/png", &png)),
            width: FALLBACK_SIZE,
            height: FALLBACK_SIZE,
            fallback: true,
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether this is the placeholder rather than the real logo.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Decoded with non-zero natural dimensions.
    pub fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

type LogoFuture = Shared<BoxFuture<'static, LogoAsset>>;

enum LogoState {
    NotLoaded,
    Loading(LogoFuture),
    Ready(LogoAsset),
    Failed(LogoAsset),
}

/// Observable phase of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoPhase {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

/// Process-lifetime logo cache with single-flight loading.
///
/// The first caller starts the load; callers arriving while it is in flight await the same shared
/// future. The terminal value (real or fallback) is memoized and never invalidated.
pub struct LogoCache {
    source: Arc<dyn LogoSource>,
    timeout: Duration,
    state: Mutex<LogoState>,
    fetches: Arc<AtomicUsize>,
}

impl LogoCache {
    pub fn new(source: Arc<dyn LogoSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            state: Mutex::new(LogoState::NotLoaded),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolve the logo. Never fails: load errors and timeouts yield [`LogoAsset::fallback`].
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn get_logo(&self) -> LogoAsset {
        let pending = {
            let mut state = self.state.lock();
            let in_flight = match &*state {
                LogoState::Ready(asset) | LogoState::Failed(asset) => return asset.clone(),
                LogoState::Loading(fut) => Some(fut.clone()),
                LogoState::NotLoaded => None,
            };
            match in_flight {
                Some(fut) => fut,
                None => {
                    let fut = self.start_load();
                    *state = LogoState::Loading(fut.clone());
                    fut
                }
            }
        };

        let asset = pending.await;

        let mut state = self.state.lock();
        if matches!(*state, LogoState::Loading(_)) {
            *state = if asset.is_fallback() {
                LogoState::Failed(asset.clone())
            } else {
                LogoState::Ready(asset.clone())
            };
        }
        asset
    }

    /// Current phase.
    pub fn phase(&self) -> LogoPhase {
        match &*self.state.lock() {
            LogoState::NotLoaded => LogoPhase::NotLoaded,
            LogoState::Loading(_) => LogoPhase::Loading,
            LogoState::Ready(_) => LogoPhase::Ready,
            LogoState::Failed(_) => LogoPhase::Failed,
        }
    }

    /// Number of underlying fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }

    /// Spawn the load so it advances, and its timeout runs, independently of any waiter.
    fn start_load(&self) -> LogoFuture {
        let source = Arc::clone(&self.source);
        let fetches = Arc::clone(&self.fetches);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            fetches.fetch_add(1, Ordering::AcqRel);
            let location = source.describe();
            let loaded = match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(Ok(bytes)) => LogoAsset::from_bytes(&bytes),
                Ok(Err(e)) => Err(TicketError::asset_load(format!("{e:#}"))),
                Err(_) => Err(TicketError::asset_load(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                ))),
            };
            match loaded {
                Ok(asset) => {
                    tracing::debug!(%location, w = asset.width, h = asset.height, "logo loaded");
                    asset
                }
                Err(e) => {
                    tracing::warn!(%location, error = %e, "logo unavailable, using fallback");
                    LogoAsset::fallback()
                }
            }
        });

        async move {
            match task.await {
                Ok(asset) => asset,
                Err(e) => {
                    tracing::warn!(error = %e, "logo load task failed, using fallback");
                    LogoAsset::fallback()
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for LogoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoCache")
            .field("source", &self.source.describe())
            .field("timeout", &self.timeout)
            .field("phase", &self.phase())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/logo.rs"]
mod tests;
