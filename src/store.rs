use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

/// File-backed set of visited region names.
///
/// Single-writer assumption: concurrent saves race and the later write wins
/// over the whole file. Acceptable for a single-user tool.
#[derive(Debug, Clone)]
pub struct VisitedStore {
    path: PathBuf,
}

impl VisitedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VisitedStore { path: path.into() }
    }

    /// Loads the visited set. Fails open: missing file, undecodable content,
    /// and read errors all yield an empty set.
    pub fn load(&self) -> BTreeSet<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return BTreeSet::new(),
            Err(e) => {
                warn!("Error loading visited set from {:?}: {}", self.path, e);
                return BTreeSet::new();
            }
        };

        if content.trim().is_empty() {
            return BTreeSet::new();
        }

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                warn!("Error decoding visited set from {:?}: {}", self.path, e);
                BTreeSet::new()
            }
        }
    }

    /// Persists the names, deduplicated and sorted, as pretty-printed JSON
    /// with non-ASCII kept literal. Returns false on any failure.
    pub fn save<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let unique: BTreeSet<&str> = names.into_iter().collect();

        let json = match serde_json::to_string_pretty(&unique) {
            Ok(j) => j,
            Err(e) => {
                warn!("Error encoding visited set: {}", e);
                return false;
            }
        };

        match fs::write(&self.path, json) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error saving visited set to {:?}: {}", self.path, e);
                false
            }
        }
    }
}
