//! # Kardia Core
//!
//! The value layer of the limbic state engine: the bounded affective state,
//! its partial-update rules, the posture classifier, configuration, and the
//! failure taxonomy. Everything here is synchronous and runtime-free; the
//! async owners (store, sync client) live in their own crates.
//!
//! ## Invariants
//!
//! - `trust`, `warmth`, `arousal`, `valence` always land in `[0.0, 1.0]`:
//!   updates clamp, they never reject.
//! - `interaction_count` and `last_interaction_ts` are monotonically
//!   non-decreasing within a session.
//! - Classification is total and deterministic; live classification goes
//!   through a smoothing/hysteresis tracker so it does not oscillate.

pub mod config;
pub mod error;
pub mod posture;
pub mod state;

pub use config::KardiaConfig;
pub use error::KardiaError;
pub use posture::{classify, PostureThresholds, PostureTracker};
pub use state::{now_ms, HistoryEntry, LimbicDelta, LimbicState, Posture};
