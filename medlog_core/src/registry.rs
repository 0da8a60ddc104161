//! Medicine registry: one record file per medicine in a directory.
//!
//! Records are keyed by a normalized form of the medicine name, so lookups
//! ignore case and punctuation ("Tylenol PM" and "tylenol-pm" share a record).

use crate::codec::{decode_medicine, encode_medicine};
use crate::fuzzy::name_dissimilarity;
use crate::{Error, Medicine, Result};
use fs2::FileExt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default maximum number of near matches returned
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default fuzzy score cutoff (exclusive)
pub const DEFAULT_CUTOFF: usize = 4;

const RECORD_EXTENSION: &str = "json";

/// Map a medicine name to its storage key
///
/// The trimmed name is lowercased and every character that is not an ASCII
/// letter or digit becomes `_`.
pub fn storage_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// A registered medicine whose name is close to a query
#[derive(Clone, Debug, PartialEq)]
pub struct NearMatch {
    pub medicine: Medicine,
    pub score: usize,
}

/// Directory-backed medicine registry
#[derive(Clone, Debug)]
pub struct MedRegistry {
    dir: PathBuf,
}

impl MedRegistry {
    /// Create a registry rooted at `dir`
    ///
    /// The directory is not created here; operations fail with
    /// [`Error::NotADirectory`] if it is missing.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `name`
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", storage_key(name), RECORD_EXTENSION))
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(Error::NotADirectory(self.dir.clone()))
        }
    }

    /// Persist a medicine record
    ///
    /// Re-registering the same name replaces the record. A different name that
    /// maps to the same storage key is a [`Error::Conflict`].
    pub fn register(&self, medicine: &Medicine) -> Result<()> {
        medicine.validate()?;
        self.ensure_dir()?;

        let path = self.record_path(&medicine.name);
        if path.exists() {
            let existing = self.get(&medicine.name)?;
            if existing.name != medicine.name {
                return Err(Error::Conflict(format!(
                    "{:?} is stored under the same key as {:?}",
                    medicine.name, existing.name
                )));
            }
            tracing::info!("Replacing registry record for {:?}", medicine.name);
        }

        let contents = encode_medicine(medicine)?;

        // Write to a temp file in the same directory, then rename over the record
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Registered {:?} at {:?}", medicine.name, path);
        Ok(())
    }

    /// Look up a medicine by name
    pub fn get(&self, name: &str) -> Result<Medicine> {
        self.ensure_dir()?;

        let path = self.record_path(name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        decode_medicine(&contents).map_err(|e| match e {
            Error::MalformedRecord(reason) => {
                Error::MalformedRecord(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// All readable records, sorted by name
    ///
    /// Files without the record extension are ignored. Records that fail to
    /// decode are skipped with a warning.
    pub fn list(&self) -> Result<Vec<Medicine>> {
        self.ensure_dir()?;

        let mut medicines = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != RECORD_EXTENSION) {
                continue;
            }

            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Failed to read record {:?}: {}", path, e);
                    continue;
                }
            };
            match decode_medicine(&contents) {
                Ok(medicine) => medicines.push(medicine),
                Err(e) => tracing::warn!("Skipping record {:?}: {}", path, e),
            }
        }

        medicines.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!("Listed {} registry records", medicines.len());
        Ok(medicines)
    }

    /// Registered medicines whose names are close to `name`
    ///
    /// Candidates are ordered by ascending score (ties keep name order) and
    /// only those scoring strictly below `cutoff` are kept. `None` disables
    /// the cutoff.
    pub fn find_near_matches(
        &self,
        name: &str,
        max_results: usize,
        cutoff: Option<usize>,
    ) -> Result<Vec<NearMatch>> {
        if cutoff == Some(0) {
            return Err(Error::Validation(
                "cutoff must be None or a positive integer".into(),
            ));
        }

        let mut candidates: Vec<NearMatch> = self
            .list()?
            .into_iter()
            .map(|medicine| NearMatch {
                score: name_dissimilarity(name, &medicine.name),
                medicine,
            })
            .collect();
        candidates.sort_by_key(|c| c.score);

        let matches: Vec<NearMatch> = candidates
            .into_iter()
            .filter(|c| cutoff.map_or(true, |cutoff| c.score < cutoff))
            .take(max_results)
            .collect();

        tracing::debug!("Found {} near matches for {:?}", matches.len(), name);
        Ok(matches)
    }
}
