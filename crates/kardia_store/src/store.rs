//! The local limbic store: sole owner of the in-memory state and history.
//!
//! Mutations run on one cooperative event loop, serialized behind a write
//! lock; each mutation replaces the snapshot, appends the previous one to
//! history and advances counters atomically with respect to readers.
//! Persistence and watch notification are issued as fire-and-forget
//! background effects; no operation blocks the caller on I/O.

use crate::persist::StateStore;
use kardia_core::state::{now_ms, HistoryEntry, LimbicDelta, LimbicState, Posture};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

/// Where an update originated. Local calls and server deltas count as
/// interactions; a server full-state replacement is authoritative and never
/// adds to the interaction counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Local,
    ServerDelta,
    ServerReplace,
}

impl UpdateSource {
    fn increments(self) -> bool {
        !matches!(self, UpdateSource::ServerReplace)
    }
}

/// Resolves an interaction kind to a partial update. The mapping is the
/// backend's responsibility; this seam exists so hosts can inject a local
/// table (or nothing) without the store knowing either way.
pub trait InteractionResolver: Send + Sync {
    fn resolve(&self, kind: &str) -> Option<LimbicDelta>;
}

enum PersistCmd {
    Save(LimbicState),
    Clear,
}

struct Inner {
    state: LimbicState,
    history: Vec<HistoryEntry>,
}

/// Explicitly constructed, dependency-injected state owner. Construct one per
/// process (or per test) and share it behind an `Arc`.
pub struct LimbicStore {
    inner: RwLock<Inner>,
    watch_tx: watch::Sender<LimbicState>,
    watch_rx: watch::Receiver<LimbicState>,
    persist_tx: mpsc::Sender<PersistCmd>,
    resolver: Option<Arc<dyn InteractionResolver>>,
}

impl LimbicStore {
    /// Open the store: load the persisted snapshot (defaults on absent or
    /// corrupt data) and spawn the background persistence writer.
    pub async fn open(
        adapter: Arc<dyn StateStore>,
        resolver: Option<Arc<dyn InteractionResolver>>,
    ) -> Self {
        let initial = match adapter.load().await {
            Ok(Some(state)) => state,
            Ok(None) => LimbicState::default(),
            Err(e) => {
                tracing::warn!("Failed to load persisted state ({}), using defaults", e);
                LimbicState::default()
            }
        };

        let (watch_tx, watch_rx) = watch::channel(initial);
        let (persist_tx, persist_rx) = mpsc::channel(64);

        Self::spawn_writer(adapter, persist_rx);

        Self {
            inner: RwLock::new(Inner {
                state: initial,
                history: Vec::new(),
            }),
            watch_tx,
            watch_rx,
            persist_tx,
            resolver,
        }
    }

    /// Single background writer: keeps durable writes ordered with respect to
    /// each other without ever blocking a mutation.
    fn spawn_writer(adapter: Arc<dyn StateStore>, mut rx: mpsc::Receiver<PersistCmd>) {
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let result = match &cmd {
                    PersistCmd::Save(state) => adapter.save(state).await,
                    PersistCmd::Clear => adapter.clear().await,
                };
                if let Err(e) = result {
                    // Non-fatal: the snapshot survives in memory and the next
                    // mutation enqueues a fresh save.
                    tracing::warn!("Persistence write failed, will retry on next mutation: {}", e);
                }
            }
        });
    }

    fn after_mutation(&self, snapshot: LimbicState, cmd: PersistCmd) {
        let _ = self.watch_tx.send(snapshot);
        if self.persist_tx.try_send(cmd).is_err() {
            tracing::warn!("Persist queue full, snapshot deferred to next mutation");
        }
    }

    /// Current snapshot. No side effects.
    pub async fn state(&self) -> LimbicState {
        self.inner.read().await.state
    }

    /// Apply a local interaction update. Merges field-by-field, clamps,
    /// appends the previous snapshot to history, advances the timestamp and
    /// increments the interaction counter.
    pub async fn update(&self, delta: LimbicDelta) {
        self.apply_delta(delta, UpdateSource::Local).await;
    }

    /// Apply a partial update from an explicit source. An empty delta is a
    /// no-op that still advances the timestamp; it never fails.
    pub async fn apply_delta(&self, delta: LimbicDelta, source: UpdateSource) {
        let mut inner = self.inner.write().await;
        let now = now_ms();

        if delta.is_empty() {
            inner.state.last_interaction_ts = inner.state.last_interaction_ts.max(now);
            let snapshot = inner.state;
            drop(inner);
            self.after_mutation(snapshot, PersistCmd::Save(snapshot));
            return;
        }

        let prev = inner.state;
        let mut next = prev.apply(&delta.clamped());
        next.last_interaction_ts = prev.last_interaction_ts.max(now);
        if source.increments() {
            next.interaction_count = prev.interaction_count + 1;
        }

        inner.history.push(HistoryEntry {
            state: prev,
            recorded_at: now,
        });
        inner.state = next;
        drop(inner);

        tracing::debug!(
            source = ?source,
            trust = next.trust,
            warmth = next.warmth,
            arousal = next.arousal,
            valence = next.valence,
            "applied limbic update"
        );
        self.after_mutation(next, PersistCmd::Save(next));
    }

    /// Server-authoritative full-state replacement. Every incoming field is
    /// taken (sanitized), including the interaction counter; the client adds
    /// no increment of its own and only enforces timestamp monotonicity.
    pub async fn replace(&self, incoming: LimbicState) {
        let mut inner = self.inner.write().await;
        let now = now_ms();

        let prev = inner.state;
        let mut next = incoming;
        next.normalize();
        next.last_interaction_ts = next
            .last_interaction_ts
            .max(prev.last_interaction_ts)
            .max(now);

        inner.history.push(HistoryEntry {
            state: prev,
            recorded_at: now,
        });
        inner.state = next;
        drop(inner);

        tracing::debug!(posture = %next.posture, "applied server state replacement");
        self.after_mutation(next, PersistCmd::Save(next));
    }

    /// Explicit posture override, bypassing the classifier. A mutation (the
    /// timestamp advances and history records it) but not an interaction.
    pub async fn set_posture(&self, posture: Posture) {
        let mut inner = self.inner.write().await;
        let now = now_ms();

        let prev = inner.state;
        let mut next = prev;
        next.posture = posture;
        next.last_interaction_ts = prev.last_interaction_ts.max(now);

        inner.history.push(HistoryEntry {
            state: prev,
            recorded_at: now,
        });
        inner.state = next;
        drop(inner);

        self.after_mutation(next, PersistCmd::Save(next));
    }

    /// Replace the state with the documented default, clear history, and
    /// remove the persisted record.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.state = LimbicState::default();
        inner.history.clear();
        let snapshot = inner.state;
        drop(inner);

        tracing::info!("limbic state reset to defaults");
        self.after_mutation(snapshot, PersistCmd::Clear);
    }

    /// Convenience wrapper: resolve an interaction kind to a partial update
    /// and apply it as a local interaction. Unresolvable kinds log and no-op.
    pub async fn apply_interaction(&self, kind: &str) {
        let Some(resolver) = &self.resolver else {
            tracing::debug!("No interaction resolver injected, '{}' ignored", kind);
            return;
        };
        match resolver.resolve(kind) {
            Some(delta) => self.update(delta).await,
            None => tracing::warn!("Unknown interaction kind '{}', ignored", kind),
        }
    }

    /// Ordered, append-only audit sequence of superseded snapshots.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.read().await.history.clone()
    }

    /// Subscribe to state updates.
    pub fn subscribe(&self) -> watch::Receiver<LimbicState> {
        self.watch_rx.clone()
    }
}
