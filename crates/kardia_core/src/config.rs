use crate::posture::PostureThresholds;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KardiaConfig {
    pub backend: BackendConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub posture: PostureConfig,
}

impl KardiaConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: KardiaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env
    /// overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("KARDIA_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Ok(v) = std::env::var("KARDIA_WS_PATH") {
            self.backend.ws_path = v;
        }
        if let Ok(v) = std::env::var("KARDIA_DB_PATH") {
            self.store.db_path = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the authoritative backend. The default points at a local
    /// development instance.
    pub base_url: String,
    /// Path of the push-channel WebSocket endpoint, joined onto `base_url`.
    pub ws_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            ws_path: "/ws/limbic".to_string(),
        }
    }
}

impl BackendConfig {
    /// The push-channel URL with the scheme switched to ws/wss.
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", base, self.ws_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the SQLite file holding the persisted snapshot.
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "kardia.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of outbound messages held while disconnected. Beyond
    /// this, the oldest queued send is dropped (and logged).
    pub queue_depth: usize,
    /// First reconnect delay.
    pub initial_backoff_ms: u64,
    /// Cap on the reconnect delay.
    pub max_backoff_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    pub trust_threshold: f32,
    pub warmth_threshold: f32,
    /// Hysteresis half-width around each threshold.
    pub band: f32,
    /// Smoothing factor for live classification (0.0 = frozen, 1.0 = instant).
    pub smoothing: f32,
}

impl Default for PostureConfig {
    fn default() -> Self {
        let th = PostureThresholds::default();
        Self {
            trust_threshold: th.trust,
            warmth_threshold: th.warmth,
            band: th.band,
            smoothing: 0.3,
        }
    }
}

impl PostureConfig {
    pub fn thresholds(&self) -> PostureThresholds {
        PostureThresholds {
            trust: self.trust_threshold,
            warmth: self.warmth_threshold,
            band: self.band,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
