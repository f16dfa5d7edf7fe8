use crate::config::Config;
use crate::error::ProbeError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves the on-disk path of the vault database without prior knowledge
/// of the application's exact data directory.
///
/// Candidates are probed in order; if none exists, the search roots are
/// walked recursively for the fixed filename. Both lists are injected so
/// tests can point the locator at a temporary directory.
pub struct Locator {
    candidates: Vec<PathBuf>,
    search_roots: Vec<PathBuf>,
    filename: String,
}

impl Locator {
    pub fn new(
        candidates: Vec<PathBuf>,
        search_roots: Vec<PathBuf>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            candidates,
            search_roots,
            filename: filename.into(),
        }
    }

    /// Production candidate list: per-user data directories under each
    /// configured application id, the per-user config directory, the shared
    /// temp directory, the working directory and its src-tauri subdirectory.
    pub fn from_config(cfg: &Config) -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let tmp = std::env::temp_dir();

        let mut candidates = Vec::new();
        if let Some(home) = &home {
            for app_id in &cfg.app_ids {
                candidates.push(home.join(".local/share").join(app_id).join(&cfg.db_filename));
            }
            for app_id in &cfg.app_ids {
                candidates.push(home.join(".config").join(app_id).join(&cfg.db_filename));
            }
        }
        candidates.push(tmp.join(&cfg.db_filename));
        candidates.push(cwd.join(&cfg.db_filename));
        candidates.push(cwd.join("src-tauri").join(&cfg.db_filename));

        let mut search_roots = Vec::new();
        if let Some(home) = &home {
            search_roots.push(home.join(".local/share"));
            search_roots.push(home.join(".config"));
        }
        search_roots.push(tmp);
        search_roots.push(cwd);

        Self::new(candidates, search_roots, cfg.db_filename.clone())
    }

    /// First existing candidate, else first match from walking the search
    /// roots. `Ok(None)` means absence; filesystem faults propagate.
    ///
    /// The fallback returns matches in directory-traversal order, which is
    /// not sorted. Callers must not assume stability of "first" when more
    /// than one match exists.
    pub fn resolve(&self) -> Result<Option<PathBuf>, ProbeError> {
        for path in &self.candidates {
            if path.is_file() {
                debug!(path = %path.display(), "candidate path exists");
                return Ok(Some(path.clone()));
            }
        }
        for root in &self.search_roots {
            if let Some(found) = search_tree(root, &self.filename)? {
                debug!(root = %root.display(), path = %found.display(), "found by tree search");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Every location this locator considers, for the not-found diagnostic.
    pub fn searched_locations(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|p| p.display().to_string())
            .chain(
                self.search_roots
                    .iter()
                    .map(|r| format!("{}/**/{}", r.display(), self.filename)),
            )
            .collect()
    }
}

fn search_tree(dir: &Path, filename: &str) -> Result<Option<PathBuf>, ProbeError> {
    if !dir.is_dir() {
        return Ok(None);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(found) = search_tree(&path, filename)? {
                return Ok(Some(found));
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(filename) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
