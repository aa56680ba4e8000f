//! # NewsRadar client
//!
//! Command-line client for the NewsRadar topic monitoring dashboard.
//!
//! The selection and feed logic lives in [`newsradar_core`]; this crate adds
//! the pieces needed to run it against a real server: an HTTP
//! [`Backend`](newsradar_core::Backend), TOML configuration, logging, and
//! the `radar` commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌─────────────┐
//! │  radar   │──▶│ Dashboard (newsradar-core)   │──▶│ HttpBackend │──▶ REST API
//! │  (CLI)   │   │ session/groups/topics/feed   │   │  (reqwest)  │
//! └──────────┘   └──────────────────────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! radar login you@example.com         # request a sign-in link
//! radar groups                        # list topic groups
//! radar topics --group Energy         # topics of one group
//! radar feed --topic <uuid> --pages 2 # content feed
//! radar bookmark 4821                 # toggle a bookmark
//! radar topic run <uuid>              # search the web for a topic now
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`client`] | `HttpBackend`, the REST implementation of `Backend` |
//! | [`records`] | JSON wire records |
//! | [`app`] | Dashboard setup shared by commands |
//! | [`logging`] | Subscriber setup and `LogObserver` |
//! | [`auth_cmd`], [`group_cmd`], [`topic_cmd`], [`feed_cmd`] | CLI commands |

pub mod app;
pub mod auth_cmd;
pub mod client;
pub mod config;
pub mod feed_cmd;
pub mod group_cmd;
pub mod logging;
pub mod records;
pub mod topic_cmd;

pub use client::HttpBackend;
pub use config::{load_config, Config};
