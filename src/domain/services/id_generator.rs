use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Hands out entity identifiers. Registered as transient: every resolution
/// gets its own generator.
#[derive(Debug)]
pub struct IdGenerator {
    instance_id: Uuid,
    issued: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            issued: AtomicU64::new(0),
        }
    }

    /// Identifies this generator instance.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn next_id(&self) -> Uuid {
        self.issued.fetch_add(1, Ordering::Relaxed);
        Uuid::new_v4()
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
