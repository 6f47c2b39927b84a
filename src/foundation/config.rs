use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{TicketError, TicketResult};

/// Backend base used when the page host is a local development host.
pub const LOCAL_API_BASE: &str = "http://localhost:4000";

/// Backend base used everywhere else.
pub const PRODUCTION_API_BASE: &str =
    "https://ticket-backend-davetechinnovation1440-jgqqgsbi.leapcell.dev";

/// What to do when the readiness wait is exhausted without observing a ready card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Warn the user and capture anyway.
    #[default]
    ProceedWithWarning,
    /// Stop the delivery attempt.
    Abort,
}

/// Opaque RGB color, serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb8(pub [u8; 3]);

impl Rgb8 {
    /// Pure white.
    pub const WHITE: Self = Self([255, 255, 255]);

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn parse(s: &str) -> TicketResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(TicketError::validation(format!(
                "color must be '#rrggbb', got '{s}'"
            )));
        }
        let mut out = [0u8; 3];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| TicketError::validation(format!("bad color '{s}': {e}")))?;
        }
        Ok(Self(out))
    }

    /// Lowercase `#rrggbb` representation.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl Serialize for Rgb8 {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb8 {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Raster capture parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSettings {
    /// Logical output width in CSS pixels.
    pub width_px: u32,
    /// Device pixel multiplier applied to width and height.
    pub pixel_ratio: f32,
    /// Background painted under the card.
    pub background: Rgb8,
    /// JPEG quality factor in `(0, 1]`.
    pub quality: f32,
    /// Unconditional pause after image checks pass.
    pub settle_delay_ms: u64,
    /// Font family forced onto the card for the duration of a capture.
    pub safe_font_family: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width_px: 330,
            pixel_ratio: 2.0,
            background: Rgb8::WHITE,
            quality: 0.95,
            settle_delay_ms: 250,
            safe_font_family: "Arial, Roboto, sans-serif".to_string(),
        }
    }
}

/// Top-level pipeline configuration, loadable from a JSON file.
///
/// Every field has a default so an empty `{}` document is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Origin of the page hosting the flow (used for QR links and backend selection).
    pub page_origin: Option<String>,
    /// Backend base for non-local hosts.
    pub production_api_base: String,
    /// Backend base for local development hosts.
    pub local_api_base: String,
    /// Hostnames treated as local development.
    pub local_hostnames: Vec<String>,
    /// Logo location: filesystem path or `http(s)` URL.
    pub logo: String,
    /// Bound on the logo fetch.
    pub logo_timeout_ms: u64,
    /// Bound on each readiness wait attempt.
    pub readiness_timeout_ms: u64,
    /// Retries after the first readiness wait attempt.
    pub readiness_max_retries: u32,
    /// Pause between readiness wait attempts.
    pub readiness_backoff_ms: u64,
    /// Behavior once readiness waits are exhausted.
    pub readiness_policy: ReadinessPolicy,
    /// Capture parameters.
    pub capture: CaptureSettings,
    /// Extra directories scanned for `.ttf`/`.otf`/`.ttc` fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Path of the persisted wizard snapshot store.
    pub state_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_origin: None,
            production_api_base: PRODUCTION_API_BASE.to_string(),
            local_api_base: LOCAL_API_BASE.to_string(),
            local_hostnames: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            logo: "logo1.webp".to_string(),
            logo_timeout_ms: 4_000,
            readiness_timeout_ms: 1_500,
            readiness_max_retries: 3,
            readiness_backoff_ms: 250,
            readiness_policy: ReadinessPolicy::default(),
            capture: CaptureSettings::default(),
            font_dirs: Vec::new(),
            state_path: PathBuf::from("ecoticket-state.json"),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make capture or waiting meaningless.
    pub fn validate(&self) -> TicketResult<()> {
        if self.capture.width_px == 0 {
            return Err(TicketError::validation("capture.width_px must be > 0"));
        }
        if !self.capture.pixel_ratio.is_finite() || self.capture.pixel_ratio <= 0.0 {
            return Err(TicketError::validation(
                "capture.pixel_ratio must be finite and > 0",
            ));
        }
        if !(self.capture.quality > 0.0 && self.capture.quality <= 1.0) {
            return Err(TicketError::validation("capture.quality must be in (0, 1]"));
        }
        if self.capture.safe_font_family.trim().is_empty() {
            return Err(TicketError::validation(
                "capture.safe_font_family must be non-empty",
            ));
        }
        if self.readiness_timeout_ms == 0 {
            return Err(TicketError::validation("readiness_timeout_ms must be > 0"));
        }
        if let Some(origin) = &self.page_origin {
            Url::parse(origin)
                .map_err(|e| TicketError::validation(format!("bad page_origin '{origin}': {e}")))?;
        }
        Ok(())
    }

    /// Page context derived from `page_origin`.
    pub fn page(&self) -> PageContext {
        PageContext::from_origin(self.page_origin.as_deref())
    }

    /// Backend base selected for this configuration's page host.
    pub fn api_base(&self) -> String {
        ApiBase::resolve(self.page().host(), self).0
    }

    pub fn logo_timeout(&self) -> Duration {
        Duration::from_millis(self.logo_timeout_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_backoff(&self) -> Duration {
        Duration::from_millis(self.readiness_backoff_ms)
    }
}

/// Where the flow is running. Without an origin there is no execution context for URL building.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageContext {
    origin: Option<Url>,
}

impl PageContext {
    /// Build from an origin string; unparsable origins are treated as absent.
    pub fn from_origin(origin: Option<&str>) -> Self {
        let origin = origin.and_then(|o| match Url::parse(o) {
            Ok(u) if u.has_host() => Some(u),
            Ok(_) | Err(_) => {
                tracing::debug!(origin = o, "ignoring unusable page origin");
                None
            }
        });
        Self { origin }
    }

    /// Parsed origin, if any.
    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    /// Host of the origin, if any.
    pub fn host(&self) -> Option<&str> {
        self.origin.as_ref().and_then(|u| u.host_str())
    }
}

/// Selected backend base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiBase(pub String);

impl ApiBase {
    /// Choose the backend by comparing the page host against the local development hostnames.
    pub fn resolve(page_host: Option<&str>, cfg: &PipelineConfig) -> Self {
        let is_local = page_host
            .map(|h| cfg.local_hostnames.iter().any(|l| l.eq_ignore_ascii_case(h)))
            .unwrap_or(false);
        let base = if is_local {
            &cfg.local_api_base
        } else {
            &cfg.production_api_base
        };
        Self(base.trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
