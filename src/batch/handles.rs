//! Transient display handles for generated artifacts.
//!
//! A handle is an opaque id that resolves to an artifact's PNG bytes for as
//! long as it is registered. Revoking it releases the registry's reference;
//! afterwards the handle resolves to nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const HANDLE_PREFIX: &str = "blob:midiator/";

/// Opaque reference to a registered artifact, displayed as `blob:midiator/<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(Uuid);

impl ArtifactHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }

    /// Parse either the displayed form or a bare uuid.
    pub fn parse(value: &str) -> Option<Self> {
        let id = value.strip_prefix(HANDLE_PREFIX).unwrap_or(value);
        Uuid::parse_str(id).ok().map(ArtifactHandle)
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", HANDLE_PREFIX, self.0)
    }
}

/// Table of live handles to PNG bytes. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    entries: Arc<RwLock<HashMap<Uuid, Arc<Vec<u8>>>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: Arc<Vec<u8>>) -> ArtifactHandle {
        let id = Uuid::new_v4();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, bytes);
        ArtifactHandle(id)
    }

    pub fn resolve(&self, handle: &ArtifactHandle) -> Option<Arc<Vec<u8>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle.0)
            .cloned()
    }

    /// Returns false when the handle was not live.
    pub fn revoke(&self, handle: &ArtifactHandle) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0)
            .is_some()
    }

    /// Revoke several handles; returns how many were live.
    pub fn revoke_all<'a>(&self, handles: impl IntoIterator<Item = &'a ArtifactHandle>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        handles
            .into_iter()
            .filter(|h| entries.remove(&h.0).is_some())
            .count()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
