use std::sync::{Arc, RwLock};

use crate::model::Record;

/// Receiver of record lifecycle notifications.
///
/// Every hook sees every record of every type; hooks filter for the types
/// they care about.
pub trait LifecycleHook: Send + Sync {
    /// A record was constructed in memory or loaded from storage.
    fn post_init(&self, _record: &mut Record) {}

    /// A record was written to storage.
    fn post_save(&self, _record: &mut Record, _created: bool) {}
}

#[derive(Default)]
pub struct Signals {
    receivers: RwLock<Vec<(String, Arc<dyn LifecycleHook>)>>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects `hook` under `dispatch_uid`. Returns false when a hook is
    /// already connected under that uid.
    pub fn connect(&self, dispatch_uid: &str, hook: Arc<dyn LifecycleHook>) -> bool {
        let Ok(mut receivers) = self.receivers.write() else {
            return false;
        };
        if receivers.iter().any(|(uid, _)| uid == dispatch_uid) {
            return false;
        }
        receivers.push((dispatch_uid.to_string(), hook));
        true
    }

    pub fn disconnect(&self, dispatch_uid: &str) -> bool {
        let Ok(mut receivers) = self.receivers.write() else {
            return false;
        };
        let before = receivers.len();
        receivers.retain(|(uid, _)| uid != dispatch_uid);
        receivers.len() != before
    }

    pub fn is_connected(&self, dispatch_uid: &str) -> bool {
        self.receivers
            .read()
            .map(|r| r.iter().any(|(uid, _)| uid == dispatch_uid))
            .unwrap_or(false)
    }

    pub fn send_post_init(&self, record: &mut Record) {
        for hook in self.snapshot() {
            hook.post_init(record);
        }
    }

    pub fn send_post_save(&self, record: &mut Record, created: bool) {
        for hook in self.snapshot() {
            hook.post_save(record, created);
        }
    }

    // Hooks run without the lock held, so they may connect others.
    fn snapshot(&self) -> Vec<Arc<dyn LifecycleHook>> {
        self.receivers
            .read()
            .map(|r| r.iter().map(|(_, hook)| hook.clone()).collect())
            .unwrap_or_default()
    }
}
