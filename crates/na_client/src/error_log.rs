use na_core::ApiError;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 64;

/// Bounded, most-recent-first record of failed requests.
///
/// Every recorded entry is also broadcast to subscribers. Subscribers that fall
/// behind miss events but the log itself is unaffected.
#[derive(Debug)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ApiError>>,
    capacity: usize,
    events: broadcast::Sender<ApiError>,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, entry: ApiError) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.push_front(entry.clone());
            entries.truncate(self.capacity);
        }
        // no subscribers is fine
        let _ = self.events.send(entry);
    }

    /// Snapshot, newest first.
    pub fn errors(&self) -> Vec<ApiError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApiError> {
        self.events.subscribe()
    }
}
