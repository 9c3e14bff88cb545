//! Fetching SVG diagrams and discarding stale fetch results.

use std::fs;
use std::io;
use std::path::PathBuf;

/// Errors that can occur when fetching a diagram.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The resource does not exist.
    #[error("diagram not found: {0}")]
    NotFound(String),

    /// The resource exists but could not be read.
    #[error("failed to read diagram {path}: {source}")]
    Io {
        /// Requested path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },

    /// The payload is not SVG markup.
    #[error("{0} does not contain an <svg> element")]
    NotSvg(String),
}

/// A path-addressed source of SVG text.
pub trait SvgSource {
    /// Fetch the diagram at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the resource is missing, unreadable, or
    /// not SVG.
    fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

/// Resolves diagram paths under a root directory. A leading `/` is
/// relative to the root, like a web server's document root.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// A source serving files under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SvgSource for DirSource {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let full = self.root.join(path.trim_start_matches('/'));
        let text = fs::read_to_string(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
            _ => FetchError::Io {
                path: path.to_string(),
                source: e,
            },
        })?;
        if !text.contains("<svg") {
            return Err(FetchError::NotSvg(path.to_string()));
        }
        tracing::debug!(path, bytes = text.len(), "fetched diagram");
        Ok(text)
    }
}

/// Identifies one fetch started through a [`FetchGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Generation counter that lets only the most recent fetch land.
///
/// Every [`begin`](Self::begin) bumps the generation; a result handed
/// to [`accept`](Self::accept) with an older ticket is dropped, so a
/// slow earlier fetch can never overwrite a later one.
#[derive(Debug, Default)]
pub struct FetchGuard {
    generation: u64,
}

impl FetchGuard {
    /// A guard with no fetch in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch, invalidating any still in flight.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    /// Returns `true` if `ticket` belongs to the most recent fetch.
    #[must_use]
    pub const fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// Pass `result` through if `ticket` is still current.
    pub fn accept<T>(&self, ticket: Ticket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::debug!(
                ticket = ticket.0,
                current = self.generation,
                "discarding stale fetch result"
            );
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn later_fetch_wins() {
        let mut guard = FetchGuard::new();
        let slow = guard.begin();
        let fast = guard.begin();
        assert_eq!(guard.accept(fast, "back.svg"), Some("back.svg"));
        assert_eq!(guard.accept(slow, "front.svg"), None);
    }

    #[test]
    fn single_fetch_is_accepted() {
        let mut guard = FetchGuard::new();
        let t = guard.begin();
        assert!(guard.is_current(t));
        assert_eq!(guard.accept(t, 1), Some(1));
    }

    #[test]
    fn dir_source_reads_under_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.svg"), "<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap();
        let source = DirSource::new(dir.path());
        assert!(source.fetch("a.svg").unwrap().starts_with("<svg"));
        assert!(source.fetch("/a.svg").is_ok());
    }

    #[test]
    fn dir_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "<html></html>").unwrap();
        let source = DirSource::new(dir.path());
        assert!(matches!(source.fetch("missing.svg"), Err(FetchError::NotFound(_))));
        assert!(matches!(source.fetch("page.html"), Err(FetchError::NotSvg(_))));
        let err = source.fetch("page.html").unwrap_err();
        assert_eq!(err.to_string(), "page.html does not contain an <svg> element");
    }
}
