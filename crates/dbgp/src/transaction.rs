use std::sync::atomic::{AtomicU32, Ordering};

pub type TransactionId = u32;

/// Ids wrap back to 1 after this value so they always fit a signed 32 bit
/// integer on the engine side.
const LAST_TRANSACTION_ID: TransactionId = i32::MAX as TransactionId;

/// Source of transaction ids for outgoing commands.
///
/// Ids start at 1 and increase by one per issued command. Issuing is atomic,
/// so concurrent callers never see the same id.
#[derive(Debug, Default)]
pub struct TransactionIds {
    last: AtomicU32,
}

impl TransactionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn starting_after(last: TransactionId) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Issue the next id.
    pub fn next(&self) -> TransactionId {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(successor(last))
            })
            .unwrap_or_else(|last| last);
        successor(previous)
    }
}

fn successor(last: TransactionId) -> TransactionId {
    if last >= LAST_TRANSACTION_ID {
        1
    } else {
        last + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = TransactionIds::new();

        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn ids_wrap_before_overflow() {
        let ids = TransactionIds::starting_after(LAST_TRANSACTION_ID - 1);

        assert_eq!(ids.next(), LAST_TRANSACTION_ID);
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn concurrent_issuance_never_repeats() {
        let ids = Arc::new(TransactionIds::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "transaction id {id} issued twice");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
