//! # dlab-biblio
//!
//! Keeps a lab bibliography in Zotero fed from HAL.
//!
//! Provides:
//! - **Import pipeline**: HAL identifiers in, Zotero items out, with
//!   per-identifier and per-batch failure reporting
//! - **Flag blocks**: yes/no workflow flags kept in a `[DLAB]` block of an
//!   item's Extra field, updated with version-checked writes
//! - **CLI**: `dlab` binary (feature `cli`), including `dlab serve` for a
//!   JSON-RPC stdio server
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> dlab_biblio::error::Result<()> {
//! use dlab_biblio::{Config, Importer};
//!
//! // Reads ZOTERO_API_KEY, ZOTERO_LIBRARY_ID and friends
//! let config = Config::from_env()?;
//! let importer = Importer::from_config(&config)?;
//!
//! let report = importer.run(&["hal-01234567", "hal-07654321"]).await?;
//! println!("{} imported, {} skipped", report.imported, report.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Flags
//!
//! ```
//! use dlab_biblio::flags;
//!
//! let extra = "note\n\n[DLAB]\nhal_create: yes\n[/DLAB]";
//! let merged = flags::merge(extra, [("comms_publish", "no")]);
//! assert_eq!(flags::parse(&merged).get("comms_publish"), Some("no"));
//! assert!(merged.starts_with("note"));
//! ```

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod flags;
pub mod identifiers;
pub mod import;
pub mod items;
pub mod parse;
pub mod rate_limit;
pub mod server;
pub mod translate;
pub mod types;
pub mod updater;
pub mod validate;
pub mod writer;

// Re-export key types at the crate root.
pub use api::Api;
pub use catalog::{CatalogSource, HalClient};
pub use client::ZoteroClient;
pub use config::{Config, LibraryRef};
pub use error::Error;
pub use flags::FlagBlock;
pub use import::Importer;
pub use updater::ItemStore;
pub use writer::ItemSink;
pub use types::*;
