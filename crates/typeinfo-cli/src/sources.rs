//! Expansion of command-line paths into the units to process.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use typeinfo::TypeInfoError;

/// Extensions picked up when walking a directory.
const SOURCE_EXTENSIONS: &[&str] = &["h", "c"];

/// Expands one command-line path into source files.
///
/// A file named explicitly is always included. A directory is skipped with
/// a warning unless `recursive` is set, in which case its C sources are
/// collected in file-name order. Anything else is skipped with a warning.
///
/// # Errors
///
/// Returns `TypeInfoError::Read` if the path or a directory below it cannot
/// be inspected.
pub fn collect_sources(path: &Path, recursive: bool) -> Result<Vec<PathBuf>, TypeInfoError> {
    let mut sources = Vec::new();
    collect_path(path, recursive, true, &mut sources)?;
    debug!(path = path.display().to_string(), count = sources.len(); "Collected sources");
    Ok(sources)
}

fn collect_path(
    path: &Path,
    recursive: bool,
    explicit: bool,
    sources: &mut Vec<PathBuf>,
) -> Result<(), TypeInfoError> {
    let metadata = fs::metadata(path).map_err(|err| read_error(path, err))?;

    if metadata.is_file() {
        if explicit || is_source(path) {
            sources.push(path.to_path_buf());
        } else {
            debug!(path = path.display().to_string(); "Skipping non-C file");
        }
    } else if metadata.is_dir() {
        if !recursive {
            warn!(path = path.display().to_string(); "Skipping directory (use -R to recurse)");
            return Ok(());
        }
        let mut entries = fs::read_dir(path)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|err| read_error(path, err))?;
        entries.sort();
        for entry in entries {
            collect_path(&entry, recursive, false, sources)?;
        }
    } else {
        warn!(path = path.display().to_string(); "Skipping file: unknown file type");
    }
    Ok(())
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn read_error(path: &Path, err: std::io::Error) -> TypeInfoError {
    TypeInfoError::Read {
        path: path.to_path_buf(),
        err,
    }
}
