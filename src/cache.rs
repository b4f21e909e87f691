//! On-disk snapshots of intermediate datasets.
//!
//! A slot is a JSON file `<root>/<slot>.json` holding a serialized [`DataSet`] (schema, rows and
//! source). The pipeline itself never caches; this is for exploratory work between runs.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::DataPaths;
use crate::error::CacheError;
use crate::types::DataSet;

/// Named-slot store for [`DataSet`] snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterimCache {
    root: PathBuf,
}

impl InterimCache {
    /// Cache rooted at `root`. The directory is created on first save.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the slot files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `slot`.
    pub fn slot_path(&self, slot: &str) -> Result<PathBuf, CacheError> {
        let valid = !slot.is_empty()
            && slot != "."
            && slot != ".."
            && !slot.contains(['/', '\\'])
            && !slot.contains('\0');
        if !valid {
            return Err(CacheError::InvalidSlot(slot.to_string()));
        }
        Ok(self.root.join(format!("{slot}.json")))
    }

    /// Serialize `dataset` into `slot`, replacing any previous snapshot.
    pub fn save(&self, dataset: &DataSet, slot: &str) -> Result<PathBuf, CacheError> {
        let path = self.slot_path(slot)?;
        fs::create_dir_all(&self.root)?;

        let mut writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer(&mut writer, dataset)?;
        writer.flush()?;

        debug!(slot, path = %path.display(), rows = dataset.row_count(), "saved dataset snapshot");
        Ok(path)
    }

    /// Read the snapshot stored in `slot`.
    pub fn load(&self, slot: &str) -> Result<DataSet, CacheError> {
        let path = self.slot_path(slot)?;
        let reader = BufReader::new(fs::File::open(&path)?);
        let dataset: DataSet = serde_json::from_reader(reader)?;
        debug!(slot, path = %path.display(), rows = dataset.row_count(), "loaded dataset snapshot");
        Ok(dataset)
    }
}

impl Default for InterimCache {
    fn default() -> Self {
        Self::new(DataPaths::default().interim())
    }
}
