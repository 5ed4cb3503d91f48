//! Uploaded files and revocable source references
//!
//! A derivation never holds the uploaded bytes directly. It leases a
//! reference from the [`SourceRegistry`], decodes through it, and the
//! reference is revoked when the lease drops, on success, failure or
//! supersede alike.

use crate::error::SourceError;
use pdf_engine::OpenSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";

/// A file handed over by the upload boundary
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { name: name.into(), mime: mime.into(), bytes: bytes.into() }
    }

    /// A file declared as `application/pdf`
    pub fn pdf(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(name, PDF_MIME, bytes)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Re-check what the upload boundary is expected to enforce
    pub fn validate(&self, max_bytes: u64) -> Result<(), SourceError> {
        if !self.mime.eq_ignore_ascii_case(PDF_MIME) {
            return Err(SourceError::UnsupportedType { mime: self.mime.clone() });
        }
        if self.bytes.is_empty() {
            return Err(SourceError::Empty);
        }
        if self.size() > max_bytes {
            return Err(SourceError::TooLarge { size: self.size(), limit: max_bytes });
        }
        Ok(())
    }
}

type Table = HashMap<Uuid, Arc<[u8]>>;

fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Table of live source references
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    table: Arc<Mutex<Table>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reference to `file`'s bytes
    pub fn lease(&self, file: &UploadedFile) -> SourceLease {
        let id = Uuid::new_v4();
        lock(&self.table).insert(id, Arc::clone(&file.bytes));
        log::debug!("leased source {id} for {} ({} bytes)", file.name, file.size());
        SourceLease { id, table: Arc::clone(&self.table) }
    }

    /// Number of references not yet revoked
    pub fn live_count(&self) -> usize {
        lock(&self.table).len()
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        lock(&self.table).contains_key(&id)
    }
}

/// Owned reference to leased bytes; revoked exactly once on drop
#[derive(Debug)]
pub struct SourceLease {
    id: Uuid,
    table: Arc<Mutex<Table>>,
}

impl SourceLease {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Byte source for the engine
    pub fn open_source(&self) -> Result<OpenSource, SourceError> {
        lock(&self.table)
            .get(&self.id)
            .cloned()
            .map(OpenSource::Shared)
            .ok_or(SourceError::Revoked(self.id))
    }

    /// Revoke now instead of at end of scope
    pub fn revoke(self) {}
}

impl Drop for SourceLease {
    fn drop(&mut self) {
        if lock(&self.table).remove(&self.id).is_some() {
            log::debug!("revoked source {}", self.id);
        }
    }
}
