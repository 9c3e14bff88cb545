//! meridian-io: Filesystem I/O and the editing session.
//!
//! Fetches SVG diagrams from disk, persists mappings as one JSON file
//! per diagram and mode, writes exported mappings, and provides the
//! [`Session`] that ties classification, editing, and persistence
//! together for a single operator.

pub mod download;
pub mod fetch;
pub mod session;
pub mod store;

pub use download::{export_filename, write_export};
pub use fetch::{DirSource, FetchError, FetchGuard, SvgSource, Ticket};
pub use session::{ClickOutcome, LoadOutcome, Session, SessionError};
pub use store::FileStore;
