//! Durable snapshot storage behind an explicit adapter interface.
//!
//! The store invokes `save`/`load`/`clear` after each mutation rather than
//! being wrapped transparently, which keeps the write-after-mutate contract
//! auditable and lets tests substitute a fake adapter. Malformed or missing
//! data loads as `None`, never as an error: state loss is recoverable from
//! the backend's authoritative copy on next sync.

use anyhow::{Context, Result};
use async_trait::async_trait;
use kardia_core::state::LimbicState;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

/// Fixed, versionless key of the single persisted record.
pub const STORE_KEY: &str = "limbic-state";

/// Key-value persistence for the serialized limbic state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Serialize the full state into the durable slot, overwriting any prior
    /// value. A save that has been acknowledged must be observed by every
    /// later `load` (read-your-writes).
    async fn save(&self, state: &LimbicState) -> Result<()>;

    /// Deserialize the persisted snapshot. `None` on missing or malformed
    /// data; the caller substitutes the default state.
    async fn load(&self) -> Result<Option<LimbicState>>;

    /// Remove the persisted record.
    async fn clear(&self) -> Result<()>;
}

// =============================================================================
// SQLite adapter
// =============================================================================

#[derive(Clone)]
pub struct SqliteStateStore {
    pool: Pool<Sqlite>,
}

impl SqliteStateStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS limbic_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create limbic_state table")?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, state: &LimbicState) -> Result<()> {
        let value = serde_json::to_string(state).context("Failed to serialize state")?;
        sqlx::query(
            r#"
            INSERT INTO limbic_state (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(STORE_KEY)
        .bind(value)
        .bind(kardia_core::now_ms())
        .execute(&self.pool)
        .await
        .context("Failed to persist state")?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<LimbicState>> {
        let row = sqlx::query("SELECT value FROM limbic_state WHERE key = ?1")
            .bind(STORE_KEY)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read persisted state")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.get("value");
        match serde_json::from_str::<LimbicState>(&raw) {
            Ok(mut state) => {
                state.normalize();
                Ok(Some(state))
            }
            Err(e) => {
                tracing::warn!("Persisted state is malformed ({}), falling back to defaults", e);
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM limbic_state WHERE key = ?1")
            .bind(STORE_KEY)
            .execute(&self.pool)
            .await
            .context("Failed to clear persisted state")?;
        Ok(())
    }
}

// =============================================================================
// In-memory adapter (tests, ephemeral hosts)
// =============================================================================

/// Fake adapter holding the serialized snapshot in memory. Stores the wire
/// form, so round-trip fidelity is exercised the same way as the real one.
#[derive(Default)]
pub struct MemStateStore {
    slot: tokio::sync::Mutex<Option<String>>,
}

impl MemStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with bytes that do not parse, to exercise the
    /// corrupt-store fallback path.
    pub async fn corrupt(&self) {
        *self.slot.lock().await = Some("{not json".to_string());
    }

    pub async fn raw(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemStateStore {
    async fn save(&self, state: &LimbicState) -> Result<()> {
        let value = serde_json::to_string(state)?;
        *self.slot.lock().await = Some(value);
        Ok(())
    }

    async fn load(&self) -> Result<Option<LimbicState>> {
        let slot = self.slot.lock().await;
        let Some(raw) = slot.as_ref() else {
            return Ok(None);
        };
        match serde_json::from_str::<LimbicState>(raw) {
            Ok(mut state) => {
                state.normalize();
                Ok(Some(state))
            }
            Err(e) => {
                tracing::warn!("Persisted state is malformed ({}), falling back to defaults", e);
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
