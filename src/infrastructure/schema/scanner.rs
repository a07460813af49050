//! Schema file scanner - discovers and parses contract ABI files from
//! the filesystem

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::abi::Schema;

/// Parsed schemas keyed by contract name (the artifact's file stem).
///
/// Note: First schema for a given name wins (no overwrite)
#[derive(Debug, Default, Clone)]
pub struct SchemaSet {
    schemas: HashMap<String, Arc<Schema>>,
    /// Number of files scanned
    pub scanned_files: usize,
    /// Per-file scan errors
    pub errors: Vec<String>,
    /// Scan duration in milliseconds
    pub scan_ms: u128,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema under a contract name
    pub fn insert(&mut self, name: String, schema: Arc<Schema>) {
        self.schemas.entry(name).or_insert(schema);
    }

    /// Look up a schema by contract name
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Get the number of loaded schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Names of all loaded contracts
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Merge another set into this one (first wins per name).
    pub fn merge(&mut self, other: Self) {
        self.scanned_files = self.scanned_files.saturating_add(other.scanned_files);
        self.errors.extend(other.errors);
        for (name, schema) in other.schemas {
            self.schemas.entry(name).or_insert(schema);
        }
    }
}

/// Schema file scanner
pub struct SchemaScanner;

impl SchemaScanner {
    /// Scan a single root directory for ABI JSON files
    pub fn scan(root: impl AsRef<Path>) -> SchemaSet {
        let started = Instant::now();
        let root = root.as_ref();
        let mut set = SchemaSet::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    set.errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            // Skip files larger than 5MB
            let metadata = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    set.errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            };
            if metadata.len() > 5 * 1024 * 1024 {
                continue;
            }

            set.scanned_files += 1;

            if let Err(err) = Self::load_schema_file(path, &mut set) {
                set.errors.push(format!("{}: {}", path.display(), err));
            }
        }

        set.scan_ms = started.elapsed().as_millis();
        debug!(
            root = %root.display(),
            files = set.scanned_files,
            loaded = set.len(),
            "schema scan finished"
        );

        set
    }

    /// Scan multiple root directories
    pub fn scan_roots(roots: &[PathBuf]) -> SchemaSet {
        let started = Instant::now();
        let mut set = SchemaSet::new();

        for root in roots {
            set.merge(Self::scan(root));
        }

        set.scan_ms = started.elapsed().as_millis();
        set
    }

    /// Load a single ABI file
    fn load_schema_file(path: &Path, set: &mut SchemaSet) -> anyhow::Result<()> {
        let content = fs::read_to_string(path)?;

        // Files without an ABI shape (raw array or "abi" field) are not
        // artifacts; skip them silently rather than flagging the walk.
        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(_) => return Ok(()),
        };
        if !value.is_array() && value.get("abi").is_none() {
            return Ok(());
        }

        let schema = Schema::parse(&content)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        set.insert(name, Arc::new(schema));
        Ok(())
    }

    /// Check if a path should be ignored
    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                matches!(
                    name,
                    ".git" | "target" | "node_modules" | ".next" | "dist" | "build"
                )
            })
            .unwrap_or(false)
    }
}
