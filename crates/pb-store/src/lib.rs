//! # pb-store
//!
//! Client-side synchronization layer for Pinboard: the board/pin mirror,
//! session comments and search over the mirrored data.

pub mod comments;
pub mod config;
pub mod join;
pub mod locks;
pub mod search;
pub mod store;

pub use comments::CommentStore;
pub use config::StoreConfig;
pub use search::{search, SearchSession};
pub use store::{BoardStore, ErrorState, OperationKind, Snapshot};
