use std::fmt;

use parking_lot::Mutex;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use super::MemoryProbe;

/// Reads available system memory, refreshing only the memory counters.
pub struct SystemMemoryProbe {
    system: Mutex<System>,
}

impl fmt::Debug for SystemMemoryProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemMemoryProbe").finish_non_exhaustive()
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            system: Mutex::new(system),
        }
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn available_bytes(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.available_memory()
    }
}
