//! Per-file change subscriptions.
//!
//! This crate provides the [`FileNotifier`] capability the deployment engine
//! uses to learn that a source file was saved, plus two implementations:
//!
//! - [`NotifyFileNotifier`] - backed by the `notify` crate, debounced through
//!   `notify-debouncer-mini`
//! - [`ManualNotifier`] - changes are pushed by the host, for editors that
//!   already report saves and for tests
//!
//! # Overview
//!
//! Subscriptions are per file and matched without regard to letter case.
//! A callback always receives the path exactly as it subscribed it, whatever
//! case or form the operating system reported.
//!
//! # Crate Dependencies
//!
//! ```text
//! spd-cli ──► spd-deploy ──► spd-watcher ──► spd-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use spd_core::WatchConfig;
//! use spd_watcher::{FileNotifier, NotifyFileNotifier};
//!
//! # fn example() -> Result<(), spd_watcher::WatchError> {
//! let notifier = NotifyFileNotifier::new(&WatchConfig::default())?;
//! let id = notifier.subscribe(
//!     Utf8Path::new("/src/Intranet/Layouts/Intranet/app.js"),
//!     Arc::new(|batch| {
//!         for event in batch {
//!             println!("File changed: {}", event.path);
//!         }
//!     }),
//! )?;
//!
//! // ...
//!
//! notifier.unsubscribe(id)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use spd_watcher::WatchError;
//!
//! fn handle_watch_error(err: WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("Fatal watcher error: {}", err);
//!     } else {
//!         eprintln!("Warning: {}", err);
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod manual;
pub mod notifier;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{FileEvent, FileEventBatch};

// Re-export notifier types
pub use manual::ManualNotifier;
pub use notifier::{ChangeCallback, FileNotifier, SubscriptionId};
pub use watcher::NotifyFileNotifier;
