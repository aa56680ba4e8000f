//! # newsradar-core
//!
//! Selection and feed synchronization core for NewsRadar clients.
//!
//! This crate holds the client-side state machine behind the monitoring
//! dashboard: which topic group, topic and content item are selected, how
//! that selection is repaired when groups or the auth state change, how the
//! content feed is reloaded without races, and how bookmarks are toggled
//! optimistically. It has no transport of its own; everything goes through
//! the [`Backend`](backend::Backend) trait.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Groups, topics, content items, selection |
//! | [`backend`] | `Backend` trait and an in-memory implementation |
//! | [`session`] | Auth status and the current user |
//! | [`groups`] | Group cache and selection repair |
//! | [`topics`] | Topic cache, group-scoped view, topic CRUD |
//! | [`feed`] | Feed loading, normalization, last-selection-wins |
//! | [`mutation`] | Optimistic bookmark toggles with rollback |
//! | [`observer`] | Change notification for frontends |
//! | [`dashboard`] | Orchestrates the stores in dependency order |
//! | [`error`] | `CoreError` |

pub mod backend;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod groups;
pub mod models;
pub mod mutation;
pub mod observer;
pub mod session;
mod sync;
pub mod topics;

pub use backend::Backend;
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use error::{CoreError, CoreResult};
pub use sync::Generation;
