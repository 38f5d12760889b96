//! # Kardia Store
//!
//! The single logical owner of the in-memory limbic state. All mutations are
//! serialized behind one lock, so a reader never observes a snapshot with new
//! numeric fields but an old counter. Durable writes happen off the caller's
//! path through a background writer; a failed write degrades to
//! log-and-retry-on-next-mutation, never to an error on the mutation itself.

pub mod persist;
pub mod store;

pub use persist::{MemStateStore, SqliteStateStore, StateStore, STORE_KEY};
pub use store::{InteractionResolver, LimbicStore, UpdateSource};
