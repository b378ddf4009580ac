//! Composer-keyed corpus enumeration.
//!
//! The corpus is a directory tree with one subdirectory per composer tag.
//! Enumeration walks a composer's subtree and collects score files by
//! extension; the known-composer list mirrors the tags the bundled corpus
//! ships with.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Composer tags the corpus layout is known to carry.
pub const KNOWN_COMPOSERS: &[&str] = &[
    "bach",
    "beethoven",
    "chopin",
    "corelli",
    "handel",
    "haydn",
    "josquin",
    "monteverdi",
    "mozart",
    "palestrina",
    "schubert",
    "schumann",
    "verdi",
];

/// Environment variable naming the corpus root directory.
pub const CORPUS_ROOT_ENV: &str = "FIRMS_CORPUS";

/// Score files under `<root>/<composer>`, sorted for stable ingest order.
///
/// `filetype` restricts to one extension; otherwise any of `extensions`
/// matches. A missing composer directory yields an empty list.
pub fn composer_paths(
    root: &Path,
    composer: &str,
    filetype: Option<&str>,
    extensions: &[&str],
) -> Vec<PathBuf> {
    let dir = root.join(composer);
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(&dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            match filetype {
                Some(wanted) => ext.eq_ignore_ascii_case(wanted),
                None => extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)),
            }
        })
        .collect();
    paths.sort();
    paths
}

/// Score files for every known composer under `root`.
pub fn corpus_paths(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    KNOWN_COMPOSERS
        .iter()
        .flat_map(|composer| composer_paths(root, composer, None, extensions))
        .collect()
}
