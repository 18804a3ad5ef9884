// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Eligible image index with a persisted id list per split.
//!
//! Scanning a full split is slow, so the list of images with at least one eligible
//! annotation is computed once and stored through an [`IdStore`]. A stored list is
//! returned as-is on later calls and is never validated against the database; delete
//! it to force a rescan.
//!
//! Two first-time calls for the same split racing on one store both scan. Each file
//! store writer uses its own temporary file and renames it into place, so the last
//! rename wins with one complete list.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::annotation::AnnotationFilter;
use crate::database::AnnotationDatabase;
use crate::error::{Result, TargetError};
use crate::{progress, section, verbose};

/// Category whose images are scanned by default.
pub const PERSON_CATEGORY: &str = "person";

/// Progress is reported every this many scanned images.
const PROGRESS_INTERVAL: usize = 100;

/// Storage backend for per-split image id lists.
pub trait IdStore {
    /// Load the stored list for `split`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::CacheError`] if a stored list exists but cannot be read.
    fn load(&self, split: &str) -> Result<Option<Vec<u64>>>;

    /// Store the list for `split`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::CacheError`] if the list cannot be written.
    fn save(&self, split: &str, ids: &[u64]) -> Result<()>;

    /// Human-readable location of the list for `split`, used in log messages.
    fn describe(&self, split: &str) -> String {
        split.to_string()
    }
}

/// Stores each split's list as a JSON array in `<data_path>/<split>_ids.json`.
#[derive(Debug, Clone)]
pub struct FileIdStore {
    data_path: PathBuf,
}

impl FileIdStore {
    /// Create a store rooted at `data_path`.
    pub fn new<P: Into<PathBuf>>(data_path: P) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    /// Path of the list file for `split`.
    #[must_use]
    pub fn path(&self, split: &str) -> PathBuf {
        self.data_path.join(format!("{split}_ids.json"))
    }
}

impl IdStore for FileIdStore {
    fn load(&self, split: &str) -> Result<Option<Vec<u64>>> {
        let path = self.path(split);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(|e| cache_error("open", &path, &e))?;
        let ids = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| cache_error("parse", &path, &e))?;
        Ok(Some(ids))
    }

    fn save(&self, split: &str, ids: &[u64]) -> Result<()> {
        let path = self.path(split);
        fs::create_dir_all(&self.data_path)
            .map_err(|e| cache_error("create directory for", &path, &e))?;

        // Unique file beside the target, removed on drop unless persisted.
        let mut temp = NamedTempFile::new_in(&self.data_path)
            .map_err(|e| cache_error("create temporary file for", &path, &e))?;
        let write = |file: &mut File| -> std::io::Result<()> {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, ids)?;
            writer.flush()
        };
        write(temp.as_file_mut()).map_err(|e| cache_error("write", temp.path(), &e))?;
        temp.persist(&path).map_err(|e| cache_error("rename into", &path, &e.error))?;
        Ok(())
    }

    fn describe(&self, split: &str) -> String {
        self.path(split).display().to_string()
    }
}

fn cache_error(action: &str, path: &Path, err: &dyn std::fmt::Display) -> TargetError {
    TargetError::CacheError(format!("failed to {action} {}: {err}", path.display()))
}

/// Keeps lists in memory, for tests and short-lived pipelines.
#[derive(Debug, Default)]
pub struct MemoryIdStore {
    lists: Mutex<HashMap<String, Vec<u64>>>,
}

impl MemoryIdStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the list for `split`, forcing the next lookup to rescan.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::CacheError`] if the store lock is poisoned.
    pub fn invalidate(&self, split: &str) -> Result<()> {
        self.lock()?.remove(split);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u64>>>> {
        self.lists
            .lock()
            .map_err(|_| TargetError::CacheError("id store lock poisoned".to_string()))
    }
}

impl IdStore for MemoryIdStore {
    fn load(&self, split: &str) -> Result<Option<Vec<u64>>> {
        Ok(self.lock()?.get(split).cloned())
    }

    fn save(&self, split: &str, ids: &[u64]) -> Result<()> {
        self.lock()?.insert(split.to_string(), ids.to_vec());
        Ok(())
    }
}

/// Finds the images of a split that have at least one eligible annotation.
#[derive(Debug)]
pub struct EligibleIndex<S: IdStore> {
    store: S,
    filter: AnnotationFilter,
    category: String,
}

impl<S: IdStore> EligibleIndex<S> {
    /// Create an index over `person` images using `filter`.
    pub fn new(store: S, filter: AnnotationFilter) -> Self {
        Self {
            store,
            filter,
            category: PERSON_CATEGORY.to_string(),
        }
    }

    /// Scan images of another category.
    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Eligible image ids of `split`, ascending.
    ///
    /// Returns the stored list if there is one. Otherwise scans `db`, stores the result
    /// and returns it. Nothing is stored if the scan fails.
    ///
    /// # Errors
    ///
    /// Propagates database failures and store read/write failures.
    pub fn eligible_image_ids<D: AnnotationDatabase + ?Sized>(
        &self,
        db: &D,
        split: &str,
    ) -> Result<Vec<u64>> {
        let location = self.store.describe(split);
        if let Some(ids) = self.store.load(split)? {
            verbose!("Loading filtered annotations for {split} from {location}");
            return Ok(ids);
        }

        section!("Filtering annotations for {split}");
        let ids = self.scan(db)?;

        verbose!("Saving filtered annotations for {split} to {location}");
        self.store.save(split, &ids)?;
        Ok(ids)
    }

    /// Scan `db` without touching the store.
    ///
    /// # Errors
    ///
    /// Propagates database failures.
    pub fn scan<D: AnnotationDatabase + ?Sized>(&self, db: &D) -> Result<Vec<u64>> {
        let category_ids = db.category_ids(&[self.category.as_str()])?;
        if category_ids.is_empty() {
            return Err(TargetError::LookupError(format!(
                "category '{}' not found",
                self.category
            )));
        }
        let mut candidates = db.image_ids(&category_ids)?;
        candidates.sort_unstable();

        let total = candidates.len();
        let mut eligible = Vec::new();
        for (i, &image_id) in candidates.iter().enumerate() {
            let annotations = db.image_annotations(image_id)?;
            if annotations.iter().any(|a| self.filter.is_eligible(a)) {
                eligible.push(image_id);
            }
            if i % PROGRESS_INTERVAL == 0 {
                progress!(i, total, "images scanned");
            }
        }

        verbose!("{} of {total} images have eligible annotations", eligible.len());
        Ok(eligible)
    }
}
