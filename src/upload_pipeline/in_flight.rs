use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Keys whose upload is queued or running.
///
/// Lets the coordinator skip a second upload of the same key while the first
/// is still pending. A key is held from enqueue until its job's terminal
/// outcome.
#[derive(Debug, Default)]
pub struct InFlightKeys {
    keys: Mutex<HashSet<String>>,
}

impl InFlightKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `key` was already registered.
    pub fn try_register(&self, key: &str) -> bool {
        self.keys.lock().unwrap().insert(key.to_string())
    }

    /// Registers `key` and returns a guard that releases it on drop unless
    /// disarmed. `None` if the key was already registered.
    pub fn claim(self: &Arc<Self>, key: &str) -> Option<InFlightClaim> {
        self.try_register(key).then(|| InFlightClaim {
            keys: self.clone(),
            key: key.to_string(),
            armed: true,
        })
    }

    pub fn release(&self, key: &str) {
        self.keys.lock().unwrap().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a key registered by [`InFlightKeys::claim`].
///
/// Dropping the claim releases the key, so a request abandoned before its job
/// reaches the queue cannot leave the key registered. Once the job is queued
/// the worker owns the key and the claim is disarmed.
#[derive(Debug)]
pub struct InFlightClaim {
    keys: Arc<InFlightKeys>,
    key: String,
    armed: bool,
}

impl InFlightClaim {
    /// Leaves the key registered. The worker releases it at the job's
    /// terminal outcome.
    pub fn hand_over(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        if self.armed {
            self.keys.release(&self.key);
        }
    }
}
