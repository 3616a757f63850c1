//! Maps file paths to stable numeric IDs and their loaded content.
//!
//! Once a path has been loaded it is never reloaded or evicted for the
//! lifetime of the store.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::RwLock;

use fsearch_log::fs_log;

const TAG: &str = "STORE";

/// Stable handle for a loaded file, derived from its path. Zero is the
/// sentinel returned when a load fails; it is never indexed.
pub type FileId = u64;

pub const SENTINEL: FileId = 0;

/// Derive a [`FileId`] from an absolute path string. Not guaranteed
/// collision-free; two distinct paths hashing to the same value would
/// silently alias in the store, a known limitation carried over unchanged.
pub fn file_id_for_path(path: &str) -> FileId {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    let id = hasher.finish();
    if id == SENTINEL {
        // Vanishingly unlikely, but keep the sentinel meaningful.
        1
    } else {
        id
    }
}

#[derive(Default)]
struct Maps {
    contents: HashMap<FileId, Vec<u8>>,
    paths: HashMap<FileId, String>,
}

/// Path / FileID / content store.
#[derive(Default)]
pub struct Store {
    maps: RwLock<Maps>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` in full and record it. Returns [`SENTINEL`] if the path
    /// was already loaded, and loads nothing. Returns [`SENTINEL`] and logs
    /// on open/read failure.
    pub fn load(&self, path: &str) -> FileId {
        let id = file_id_for_path(path);

        {
            let maps = self.maps.read().unwrap();
            if maps.paths.contains_key(&id) {
                return id;
            }
        }

        let content = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                fs_log!(log::Level::Error, TAG, "failed to load '{path}': {e}");
                return SENTINEL;
            }
        };

        let mut maps = self.maps.write().unwrap();
        maps.contents.insert(id, content);
        maps.paths.insert(id, path.to_string());
        id
    }

    /// Empty if `id` is unknown.
    pub fn content(&self, id: FileId) -> Vec<u8> {
        self.maps
            .read()
            .unwrap()
            .contents
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Empty if `id` is unknown.
    pub fn path(&self, id: FileId) -> String {
        self.maps
            .read()
            .unwrap()
            .paths
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loaded_id(&self, id: FileId) -> bool {
        self.maps.read().unwrap().paths.contains_key(&id)
    }

    pub fn is_loaded_path(&self, path: &str) -> bool {
        self.is_loaded_id(file_id_for_path(path))
    }

    pub fn len(&self) -> usize {
        self.maps.read().unwrap().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
