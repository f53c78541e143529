//! The output manifest: everything the emitter must copy.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One copy the emitter will perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Absolute path of the file to copy.
    pub source: PathBuf,
    /// Destination path relative to the output directory.
    pub dest: PathBuf,
}

/// Ordered list of (source, destination) copy pairs, built up by the asset
/// locator and the static-copy configuration, consumed once by the emitter.
///
/// Appending the same source twice is a no-op that returns the destination
/// chosen the first time. Distinct sources that would land on the same
/// destination get a numeric suffix instead.
#[derive(Debug, Default)]
pub struct OutputManifest {
    entries: Vec<ManifestEntry>,
    by_source: HashMap<PathBuf, PathBuf>,
    used_dests: HashSet<PathBuf>,
}

impl OutputManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy entry, returning the destination actually assigned.
    pub fn insert(&mut self, source: PathBuf, preferred_dest: PathBuf) -> PathBuf {
        if let Some(existing) = self.by_source.get(&source) {
            return existing.clone();
        }

        let dest = self.unique_dest(preferred_dest);
        self.entries.push(ManifestEntry {
            source: source.clone(),
            dest: dest.clone(),
        });
        self.by_source.insert(source, dest.clone());
        self.used_dests.insert(dest.clone());
        dest
    }

    /// The destination already assigned to `source`, if any.
    pub fn dest_for(&self, source: &Path) -> Option<&PathBuf> {
        self.by_source.get(source)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn unique_dest(&self, preferred: PathBuf) -> PathBuf {
        if !self.used_dests.contains(&preferred) {
            return preferred;
        }

        let stem = preferred
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = preferred
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        let parent = preferred.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut n = 1usize;
        loop {
            let name = match &ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            let candidate = parent.join(name);
            if !self.used_dests.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
