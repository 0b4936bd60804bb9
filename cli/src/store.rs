//! Scratch key-value store that answers through host requests.
//!
//! Every operation returns a [`HostRequest`] immediately and completes it on
//! a later scheduling turn, the way an event-driven storage API would.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hostbridge_core::HostRequest;
use hostbridge_types::{HostError, HostValue, StoreSettings};
use tokio::runtime::Handle;

type Entries = BTreeMap<String, HostValue>;

#[derive(Debug, Clone)]
pub struct ScratchStore {
    entries: Arc<Mutex<Entries>>,
    latency: Duration,
    runtime: Handle,
}

impl ScratchStore {
    #[must_use]
    pub fn new(settings: StoreSettings, runtime: Handle) -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            latency: settings.latency(),
            runtime,
        }
    }

    /// Succeeds with the stored value, fails with `NotFoundError`.
    pub fn get(&self, key: &str) -> Arc<HostRequest> {
        let key = key.to_string();
        self.issue(move |entries| {
            entries.get(&key).cloned().ok_or_else(|| {
                HostError::new("NotFoundError", format!("no value for key '{key}'"))
            })
        })
    }

    /// Succeeds with the key.
    pub fn put(&self, key: &str, value: HostValue) -> Arc<HostRequest> {
        let key = key.to_string();
        self.issue(move |entries| {
            entries.insert(key.clone(), value);
            Ok(HostValue::String(key))
        })
    }

    /// Succeeds whether or not the key existed.
    pub fn delete(&self, key: &str) -> Arc<HostRequest> {
        let key = key.to_string();
        self.issue(move |entries| {
            entries.remove(&key);
            Ok(HostValue::Null)
        })
    }

    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn issue<F>(&self, op: F) -> Arc<HostRequest>
    where
        F: FnOnce(&mut Entries) -> Result<HostValue, HostError> + Send + 'static,
    {
        let request = HostRequest::new();
        let host = Arc::clone(&request);
        let entries = Arc::clone(&self.entries);
        let latency = self.latency;

        self.runtime.spawn(async move {
            if latency.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(latency).await;
            }

            let outcome = {
                let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
                op(&mut entries)
            };
            let fired = match outcome {
                Ok(value) => host.succeed(value),
                Err(error) => host.fail(error),
            };
            if let Err(e) = fired {
                tracing::warn!("Scratch store request completed twice: {e}");
            }
        });

        request
    }
}
