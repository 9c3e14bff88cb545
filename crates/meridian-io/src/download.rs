//! Writing exported mappings to disk.

use std::io;
use std::path::{Path, PathBuf};

use meridian_core::MappingMode;

use crate::store::write_atomic;

/// Export filename for a diagram: `{stem}-{mode}-mapping.json`, where
/// `stem` is the source's file name without its extension.
///
/// ```
/// use meridian_core::MappingMode;
/// use meridian_io::export_filename;
///
/// assert_eq!(
///     export_filename("/assets/front.svg", MappingMode::Principal),
///     "front-principal-mapping.json"
/// );
/// ```
#[must_use]
pub fn export_filename(source_ref: &str, mode: MappingMode) -> String {
    let name = source_ref.rsplit('/').next().unwrap_or(source_ref);
    let stem = name.rsplit_once('.').map_or(name, |(base, _)| base);
    let stem = if stem.is_empty() { "diagram" } else { stem };
    format!("{stem}-{}-mapping.json", mode.key())
}

/// Write an exported mapping into `dir`, returning the file's path.
///
/// # Errors
///
/// Returns an I/O error if the directory or file cannot be written.
pub fn write_export(
    dir: &Path,
    source_ref: &str,
    mode: MappingMode,
    contents: &str,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(source_ref, mode));
    write_atomic(&path, contents)?;
    tracing::info!(path = %path.display(), "wrote mapping export");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn filename_strips_directories_and_extension() {
        assert_eq!(
            export_filename("diagrams/back.view.svg", MappingMode::Extraordinary),
            "back.view-extraordinary-mapping.json"
        );
        assert_eq!(
            export_filename("noext", MappingMode::Governing),
            "noext-governing-mapping.json"
        );
        assert_eq!(
            export_filename("dir/", MappingMode::Principal),
            "diagram-principal-mapping.json"
        );
    }

    #[test]
    fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "front.svg", MappingMode::Principal, "{}").unwrap();
        assert_eq!(path.file_name().unwrap(), "front-principal-mapping.json");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}
