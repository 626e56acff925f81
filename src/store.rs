//! Per-subject signature storage.
//!
//! The analyzer reads a subject's prior signatures before matching and
//! appends the new signature afterwards. Implementations must publish a
//! signature atomically: a concurrent reader sees either the complete
//! signature or nothing.

use crate::core::pattern::SessionSignature;
use std::collections::HashMap;
use std::sync::RwLock;

/// Store access errors.
#[derive(Debug)]
pub enum StoreError {
    /// The backing store could not be reached
    Unavailable(String),
    /// A writer panicked while holding the lock
    Poisoned,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "Signature store unavailable: {reason}"),
            StoreError::Poisoned => write!(f, "Signature store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Append-only, subject-keyed signature history.
pub trait SignatureStore: Send + Sync {
    /// Prior signatures of a subject, oldest first.
    fn get(&self, subject_id: &str) -> Result<Vec<SessionSignature>, StoreError>;

    /// Append a completed signature under its subject.
    fn append(&self, signature: SessionSignature) -> Result<(), StoreError>;
}

/// In-process store backed by a lock-guarded map.
#[derive(Debug, Default)]
pub struct MemorySignatureStore {
    subjects: RwLock<HashMap<String, Vec<SessionSignature>>>,
}

impl MemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing signatures, keeping their order.
    pub fn with_signatures(signatures: impl IntoIterator<Item = SessionSignature>) -> Self {
        let mut subjects: HashMap<String, Vec<SessionSignature>> = HashMap::new();
        for signature in signatures {
            subjects
                .entry(signature.subject_id.clone())
                .or_default()
                .push(signature);
        }
        Self {
            subjects: RwLock::new(subjects),
        }
    }

    /// Number of signatures across all subjects.
    pub fn len(&self) -> usize {
        self.subjects
            .read()
            .map(|map| map.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignatureStore for MemorySignatureStore {
    fn get(&self, subject_id: &str) -> Result<Vec<SessionSignature>, StoreError> {
        let subjects = self.subjects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(subjects.get(subject_id).cloned().unwrap_or_default())
    }

    fn append(&self, signature: SessionSignature) -> Result<(), StoreError> {
        // The signature is fully built before the lock is taken
        let mut subjects = self.subjects.write().map_err(|_| StoreError::Poisoned)?;
        subjects
            .entry(signature.subject_id.clone())
            .or_default()
            .push(signature);
        Ok(())
    }
}
