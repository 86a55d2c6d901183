//! Change-triggered deployment of SharePoint project files.
//!
//! This crate copies a saved source file to where SharePoint serves it from,
//! so edits show up without packaging and redeploying the solution.
//!
//! # Overview
//!
//! The main entry point is [`WatchRegistry`], which combines:
//!
//! - a [`FileNotifier`](spd_watcher::FileNotifier): one subscription per
//!   watched file
//! - [`DeploymentWriter`]: destination resolution and the actual write
//!   - [`PathTokenResolver`]: `{ProjectRoot}`, `{SharePointRoot}` and
//!     `{WebApplicationRoot}` in deployment paths
//!   - [`ExtensionPolicyCache`]: which extensions receive content tokens
//!   - [`ContentTokenCache`]: the `$SharePoint.*$` values per project
//! - [`DeployStats`]: atomic counters for what happened to each change
//!
//! # Architecture
//!
//! ```text
//! FileNotifier ──change──► WatchRegistry ──lookup──► ProjectModel
//!                               │
//!                               └──deploy──► DeploymentWriter
//!                                                 ├── PathTokenResolver
//!                                                 ├── ExtensionPolicyCache ──► BuildEvaluator
//!                                                 └── ContentTokenCache ─────► AssemblyInspector
//! ```
//!
//! # Error Handling
//!
//! A failed deployment is logged and counted; the watch stays in place and
//! the next save tries again. [`DeployError`] names the failing step and
//! path.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod content_tokens;
pub mod error;
pub mod extensions;
pub mod path_tokens;
pub mod registry;
pub mod stats;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use content_tokens::{ContentTokenCache, ContentTokenTable};
pub use error::{DeployError, TokenError};
pub use extensions::ExtensionPolicyCache;
pub use path_tokens::PathTokenResolver;
pub use registry::{ResyncSummary, WatchRegistry};
pub use stats::{DeployStats, DeployStatsSnapshot};
pub use writer::{DeployOutcome, DeploymentWriter};
