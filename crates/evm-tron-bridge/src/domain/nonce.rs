//! Per-sender sequence numbers the target chain does not provide.
//!
//! Best effort: assumes a single client submitting in increasing nonce order.
//! Out-of-order or racing submissions are not reconciled.

use super::types::Address;
use std::collections::HashMap;

/// The gateway's view of "next nonce" per sender. Session scoped.
#[derive(Debug, Default)]
pub struct NonceEmulator {
    next: HashMap<Address, u64>,
}

impl NonceEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next expected nonce, zero for an unseen sender. Never mutates.
    pub fn peek_next(&self, sender: &Address) -> u64 {
        self.next.get(sender).copied().unwrap_or(0)
    }

    /// Record an accepted transaction's nonce. The counter only moves up.
    pub fn observe(&mut self, sender: Address, declared_nonce: u64) {
        let candidate = declared_nonce.saturating_add(1);
        let current = self.next.entry(sender).or_insert(0);
        if candidate > *current {
            *current = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_sender_starts_at_zero() {
        let nonces = NonceEmulator::new();
        assert_eq!(nonces.peek_next(&Address::repeat_byte(1)), 0);
    }

    #[test]
    fn test_observe_is_monotonic() {
        let sender = Address::repeat_byte(0xaa);
        let mut nonces = NonceEmulator::new();

        nonces.observe(sender, 5);
        assert_eq!(nonces.peek_next(&sender), 6);

        nonces.observe(sender, 3);
        assert_eq!(nonces.peek_next(&sender), 6);

        nonces.observe(sender, 6);
        assert_eq!(nonces.peek_next(&sender), 7);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let sender = Address::repeat_byte(2);
        let mut nonces = NonceEmulator::new();
        nonces.observe(sender, 0);
        assert_eq!(nonces.peek_next(&sender), 1);
        assert_eq!(nonces.peek_next(&sender), 1);
    }

    #[test]
    fn test_senders_are_independent() {
        let mut nonces = NonceEmulator::new();
        nonces.observe(Address::repeat_byte(1), 9);
        assert_eq!(nonces.peek_next(&Address::repeat_byte(2)), 0);
    }
}
