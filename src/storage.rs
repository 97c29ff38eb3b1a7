//! Storage layer for hearth
//!
//! Manages persistent state under a single data root:
//!
//! ```text
//! .hearth/                      # data root
//!   households.json             # registry of households, members, contexts
//!   <household-id>/
//!     tasks.json                # task snapshot, versioned records
//!     activity.jsonl            # append-only activity log
//!     notifications.json        # per-recipient notification lists
//! ```
//!
//! All writes go through lock + temp-file + rename so concurrent member
//! processes never observe a partial file.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::household::HouseholdRegistry;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

const REGISTRY_FILE: &str = "households.json";
const TASKS_FILE: &str = "tasks.json";
const ACTIVITY_LOG: &str = "activity.jsonl";
const NOTIFICATIONS_FILE: &str = "notifications.json";

/// Storage manager for hearth state
#[derive(Debug, Clone)]
pub struct Storage {
    /// Data root directory
    root: PathBuf,
}

impl Storage {
    /// Create a storage manager rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Data root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the household registry
    pub fn registry_file(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Per-household state directory
    pub fn household_dir(&self, household: Uuid) -> PathBuf {
        self.root.join(household.to_string())
    }

    /// Path to a household's task snapshot
    pub fn tasks_file(&self, household: Uuid) -> PathBuf {
        self.household_dir(household).join(TASKS_FILE)
    }

    /// Path to a household's activity log (JSONL)
    pub fn activity_file(&self, household: Uuid) -> PathBuf {
        self.household_dir(household).join(ACTIVITY_LOG)
    }

    /// Path to a household's notification lists
    pub fn notifications_file(&self, household: Uuid) -> PathBuf {
        self.household_dir(household).join(NOTIFICATIONS_FILE)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize the data root, creating an empty registry if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let registry_file = self.registry_file();
        if !registry_file.exists() {
            self.write_json(&registry_file, &HouseholdRegistry::default())?;
        }

        Ok(())
    }

    /// Check whether the data root has been initialized
    pub fn is_initialized(&self) -> bool {
        self.registry_file().exists()
    }

    /// Create the per-household directory
    pub fn init_household_dir(&self, household: Uuid) -> Result<()> {
        fs::create_dir_all(self.household_dir(household))?;
        Ok(())
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON data atomically (temp file + rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Append a record to a JSONL file.
    ///
    /// Takes the file's lock and writes record-plus-newline as a single
    /// buffer, so concurrent appenders never interleave partial lines.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let lock_path = path.with_extension("jsonl.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all records from a JSONL file
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }

    // =========================================================================
    // Household registry operations (locked)
    // =========================================================================

    /// Read the household registry
    pub fn read_registry(&self) -> Result<HouseholdRegistry> {
        let path = self.registry_file();
        if !path.exists() {
            return Ok(HouseholdRegistry::default());
        }
        self.read_json(&path)
    }

    /// Apply a mutation to the registry under an exclusive lock
    pub fn update_registry<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut HouseholdRegistry) -> Result<T>,
    {
        let path = self.registry_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_path = path.with_extension("json.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut registry = if path.exists() {
            self.read_json(&path)?
        } else {
            HouseholdRegistry::default()
        };

        let result = f(&mut registry)?;
        registry.validate()?;

        let json = serde_json::to_string_pretty(&registry)?;
        lock::write_atomic(&path, json.as_bytes())?;

        Ok(result)
    }
}
