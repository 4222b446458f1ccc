//! Resource loading for tabulated datasets.
//!
//! Spectra and throughput curves refer to their data by a logical path. A
//! [`ResourceLoader`] turns that path into a line-oriented stream; the
//! parsing into a [`Table`] is shared by every loader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use super::table::{Table, TableError};

/// Source of tabulated `(wavelength, value)` resources
pub trait ResourceLoader {
    /// Open the resource at a logical path
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>, TableError>;

    /// Open and parse the resource at a logical path
    fn load_table(&self, path: &str) -> Result<Table, TableError> {
        let reader = self.open(path)?;
        Table::parse(reader)
    }
}

/// Loads resources from files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceLoader for DirectoryLoader {
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>, TableError> {
        let full_path = self.root.join(path);
        log::debug!("Opening resource {}", full_path.display());
        match File::open(&full_path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TableError::NotFound(full_path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Serves resources from an in-memory map, for embedded data and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a resource
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.resources.insert(path.into(), contents.into());
    }

    /// Builder form of [`MemoryLoader::insert`]
    pub fn with(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl ResourceLoader for MemoryLoader {
    fn open(&self, path: &str) -> Result<Box<dyn BufRead + '_>, TableError> {
        self.resources
            .get(path)
            .map(|text| Box::new(Cursor::new(text.as_bytes())) as Box<dyn BufRead + '_>)
            .ok_or_else(|| TableError::NotFound(path.to_string()))
    }
}
