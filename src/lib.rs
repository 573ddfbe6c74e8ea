// Copyright (c) 2025 Prefsync Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # prefsync
//!
//! Backup and restore of chat client preferences across sessions.
//!
//! Favourite GIFs, favourite and recently used emoji, keybinds, voice,
//! accessibility, notification and experiment settings are snapshotted into
//! durable key-value storage whenever they change and pushed back into the
//! live client once per session. Emote state that diverged between sessions
//! is never merged silently; the user picks which side wins.

pub mod arbiter;
pub mod config;
pub mod database;
pub mod error;
pub mod host;
pub mod identity;
pub mod live;
pub mod reconcile;
pub mod sampling;
pub mod service;
pub mod store;
pub mod trigger;
pub mod types;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use reconcile::{Reconciler, RestoreOutcome};
pub use service::{PersistService, ServiceStatus, SyncStatistics};
pub use types::*;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
