use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// A document loaded into the database.
#[salsa::input(debug)]
pub struct SourceFile {
    #[returns(ref)]
    pub path: PathBuf,
    #[returns(ref)]
    pub text: String,
}

/// An argument supplied for evaluating a document's predicate.
#[salsa::input(debug)]
pub struct EvalRequest {
    pub file: SourceFile,
    /// JSON text of the argument value.
    #[returns(ref)]
    pub arg: String,
}

#[derive(Default, Clone)]
#[salsa::db]
pub struct ExprkitDatabaseImpl {
    storage: salsa::Storage<Self>,
    files: Arc<DashMap<PathBuf, SourceFile>>,
}

#[salsa::db]
impl salsa::Database for ExprkitDatabaseImpl {}

impl ExprkitDatabaseImpl {
    /// Load `path` from disk, once.
    pub fn input(
        &self,
        path: PathBuf,
    ) -> Result<SourceFile, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.canonicalize()?;
        match self.files.entry(path.clone()) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let contents = std::fs::read_to_string(&path)?;
                let source_file = SourceFile::new(self, path, contents);
                entry.insert(source_file);
                Ok(source_file)
            }
        }
    }

    /// Register an in-memory document, replacing any earlier one at `path`.
    pub fn open_document(&self, path: impl Into<PathBuf>, text: impl Into<String>) -> SourceFile {
        let path = path.into();
        let source_file = SourceFile::new(self, path.clone(), text.into());
        self.files.insert(path, source_file);
        source_file
    }

    pub fn close_document(&self, path: &std::path::Path) {
        self.files.remove(path);
    }

    pub fn source_file(&self, path: &std::path::Path) -> Option<SourceFile> {
        self.files.get(path).map(|entry| *entry)
    }
}
