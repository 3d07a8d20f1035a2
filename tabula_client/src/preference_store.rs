//! Persistence of display preferences with silent in-memory fallback.
//!
//! Loads never fail: a missing key, unreadable storage, or a value that no
//! longer decodes all produce the caller's default. Saves are fire and
//! forget. Once the backend reports itself unavailable, the store keeps
//! working from its session copy and stops touching the backend.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use tabula_common::codec;

use crate::storage::StorageBackend;

/// Serializes backend writes so that the last save of a key wins even when
/// writes complete out of order on the blocking pool.
#[derive(Default)]
struct WriteLedger {
    next_seq: u64,
    written: HashMap<String, u64>,
}

pub struct PreferenceStore {
    backend: Arc<dyn StorageBackend>,
    session: Mutex<HashMap<String, Vec<u8>>>,
    degraded: Arc<AtomicBool>,
    ledger: Arc<Mutex<WriteLedger>>,
    pending: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

impl PreferenceStore {
    pub fn new(backend: impl StorageBackend) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    pub fn from_shared(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            session: Default::default(),
            degraded: Default::default(),
            ledger: Default::default(),
            pending: Default::default(),
        }
    }

    /// True once the backend has failed and the store runs from memory only
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Load the value stored under `key`, or `default` if there is none or
    /// it cannot be read.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let session_copy = self
            .session
            .lock()
            .ok()
            .and_then(|lock| lock.get(key).cloned());

        let bytes = match session_copy {
            Some(b) => Some(b),
            None if self.is_degraded() => None,
            None => match self.backend.get(key) {
                Ok(b) => b,
                Err(e) => {
                    warn!("Preference storage unavailable, using memory: {e}");
                    self.degraded.store(true, Ordering::Release);
                    None
                }
            },
        };

        let Some(bytes) = bytes else {
            debug!("No stored value for {key}, using default");
            return default;
        };

        match codec::from_bytes(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!("Stored value for {key} is unreadable ({e}), using default");
                default
            }
        }
    }

    /// Save a value under `key`.
    ///
    /// The session copy is updated immediately. Inside a tokio runtime the
    /// backend write happens on the blocking pool; see [Self::flush].
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match codec::to_bytes(value) {
            Ok(b) => b,
            Err(e) => {
                warn!("Unable to encode value for {key}: {e}");
                return;
            }
        };

        if let Ok(mut lock) = self.session.lock() {
            lock.insert(key.to_string(), bytes.clone());
        }

        if self.is_degraded() {
            debug!("Storage degraded, {key} kept in memory only");
            return;
        }

        let seq = match self.ledger.lock() {
            Ok(mut l) => {
                l.next_seq += 1;
                l.next_seq
            }
            Err(_) => return,
        };

        let write = {
            let backend = self.backend.clone();
            let degraded = self.degraded.clone();
            let ledger = self.ledger.clone();
            let key = key.to_string();

            move || write_through(&*backend, &degraded, &ledger, &key, seq, bytes)
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn_blocking(write);
                if let Ok(mut pending) = self.pending.lock() {
                    pending.retain(|t| !t.is_finished());
                    pending.push(task);
                }
            }
            Err(_) => write(),
        }
    }

    /// Wait for all backend writes issued so far
    pub async fn flush(&self) {
        let tasks: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };

        for t in tasks {
            if let Err(e) = t.await {
                warn!("Preference write task failed: {e}");
            }
        }
    }
}

fn write_through(
    backend: &dyn StorageBackend,
    degraded: &AtomicBool,
    ledger: &Mutex<WriteLedger>,
    key: &str,
    seq: u64,
    bytes: Vec<u8>,
) {
    // holding the ledger across the write keeps writes to a key ordered
    let Ok(mut ledger) = ledger.lock() else {
        return;
    };

    if ledger.written.get(key).is_some_and(|&last| last > seq) {
        debug!("Skipping superseded write for {key}");
        return;
    }

    match backend.set(key, bytes) {
        Ok(()) => {
            ledger.written.insert(key.to_string(), seq);
        }
        Err(e) => {
            warn!("Preference storage unavailable, using memory: {e}");
            degraded.store(true, Ordering::Release);
        }
    }
}
