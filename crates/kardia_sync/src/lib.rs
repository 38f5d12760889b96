//! # Kardia Sync
//!
//! Keeps the local limbic store reconciled with the authoritative backend
//! over two independent channels:
//!
//! 1. A persistent push channel (WebSocket): full-state replacements and
//!    partial deltas flow in; locally-originated interactions flow out,
//!    tagged with idempotency tokens so the backend's echo is applied once.
//! 2. A one-shot request/response call for actions expecting a single
//!    structured reply (the convergence answer flow).
//!
//! The connection is an explicit state machine with an owned outbound queue,
//! so reconnect, backoff and queueing are unit-testable without a network.

pub mod backoff;
pub mod client;
pub mod convergence;
pub mod message;
pub mod queue;

pub use backoff::Backoff;
pub use client::{apply_server_message, ConnectionState, SyncClient, TokenRing};
pub use convergence::ConvergenceClient;
pub use message::{ClientMessage, ServerMessage};
pub use queue::SendQueue;
