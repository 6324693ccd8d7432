//! Resource lifecycle management
//!
//! Synthesized payloads are kept in a process-local store and addressed by
//! revocable handles. A handle stays resolvable until it is released; release
//! is idempotent so teardown paths can call it unconditionally.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// URI scheme prefix for locally-scoped payload addresses
const URI_PREFIX: &str = "blob:pulse/";

/// Opaque, revocable reference to an in-memory audio payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceHandle {
    id: Uuid,
    uri: String,
}

impl ResourceHandle {
    fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            uri: format!("{}{}", URI_PREFIX, id),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Locally-scoped address the renderer can be pointed at
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Store of live payloads, shared by clones
#[derive(Clone, Default)]
pub struct ResourceManager {
    live: Arc<Mutex<HashMap<Uuid, Bytes>>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a payload in a new handle
    pub fn acquire(&self, payload: Bytes) -> ResourceHandle {
        let handle = ResourceHandle::new();
        debug!("Acquired {} ({} bytes)", handle, payload.len());
        self.live.lock().insert(handle.id, payload);
        handle
    }

    /// Acquire a handle that is released when the lease is dropped
    pub fn lease(&self, payload: Bytes) -> ResourceLease {
        let handle = self.acquire(payload);
        ResourceLease {
            manager: self.clone(),
            handle,
        }
    }

    /// Invalidate a handle and free its payload
    ///
    /// Returns `false` when the handle was already released or never issued.
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let freed = self.live.lock().remove(&handle.id).is_some();
        if freed {
            debug!("Released {}", handle);
        }
        freed
    }

    /// Payload behind a live handle
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Bytes> {
        self.live.lock().get(&handle.id).cloned()
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.live.lock().contains_key(&handle.id)
    }

    /// Number of payloads currently held
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("live", &self.live_count())
            .finish()
    }
}

/// Scoped ownership of one handle; releases on drop
#[derive(Debug)]
pub struct ResourceLease {
    manager: ResourceManager,
    handle: ResourceHandle,
}

impl ResourceLease {
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn payload(&self) -> Option<Bytes> {
        self.manager.resolve(&self.handle)
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.manager.release(&self.handle);
    }
}
