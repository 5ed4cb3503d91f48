//! Generation gate for superseding overlapping derivations

use crate::CancellationToken;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Permission to run one derivation
///
/// `generation` is strictly increasing across tickets issued by one gate.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub generation: u64,
    pub token: CancellationToken,
}

impl Ticket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Issues numbered tickets; only the newest one is current
///
/// Beginning a derivation cancels the token of the one before it, so
/// in-flight work notices at its next checkpoint. Work that has already
/// finished is rejected at publish time through [`GenerationGate::is_current`].
#[derive(Debug, Default)]
pub struct GenerationGate {
    latest: AtomicU64,
    active: Mutex<Option<CancellationToken>>,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new derivation, superseding the previous one
    pub fn begin(&self) -> Ticket {
        let token = CancellationToken::new();
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(previous) = active.replace(token.clone()) {
            if !previous.is_cancelled() {
                log::debug!("generation {generation} supersedes generation {}", generation - 1);
            }
            previous.cancel();
        }

        Ticket { generation, token }
    }

    /// Whether `generation` is still the newest ticket issued
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::Acquire) == generation
    }

    /// Newest generation issued so far (0 before the first ticket)
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Cancel the active ticket without issuing a new one
    pub fn cancel_active(&self) {
        let active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(token) = active.as_ref() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_generations_increase() {
        let gate = GenerationGate::new();
        assert_eq!(gate.latest(), 0);

        let a = gate.begin();
        let b = gate.begin();
        assert_eq!(a.generation, 1);
        assert_eq!(b.generation, 2);
        assert_eq!(gate.latest(), 2);
    }

    #[test]
    fn test_begin_cancels_previous_ticket() {
        let gate = GenerationGate::new();

        let first = gate.begin();
        assert!(!first.is_cancelled());
        assert!(gate.is_current(first.generation));

        let second = gate.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!gate.is_current(first.generation));
        assert!(gate.is_current(second.generation));
    }

    #[test]
    fn test_cancel_active() {
        let gate = GenerationGate::new();
        let ticket = gate.begin();

        gate.cancel_active();
        assert!(ticket.is_cancelled());
        // Cancelling does not issue a new generation
        assert!(gate.is_current(ticket.generation));
    }

    #[test]
    fn test_concurrent_begin_yields_unique_generations() {
        let gate = Arc::new(GenerationGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || (0..50).map(|_| gate.begin().generation).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(gate.latest(), 400);
    }
}
