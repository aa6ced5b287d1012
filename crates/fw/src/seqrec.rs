//! Sequence records for request/confirmation coordination.
//!
//! A requester saves one `(destination, sequence)` pair per outstanding
//! request. A confirmation is accepted only if its source and sequence match
//! a saved pair, which clears it. Everything else is treated as stale and
//! leaves the record untouched.

use heapless::Vec;

use crate::error::ErrorCode;
use crate::msg::MsgId;
use crate::signal::{Hsmn, Sequence};

/// Outcome of checking a confirmation against a sequence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfmOutcome {
    /// No outstanding request matched; the record is unchanged.
    Ignored,
    /// Matched and succeeded; other confirmations are still pending.
    Pending,
    /// Matched and succeeded; this was the last one.
    AllReceived,
    /// Matched but reported failure.
    Failed,
}

impl CfmOutcome {
    /// `false` only when a matched confirmation reported failure.
    pub const fn handled_ok(self) -> bool {
        !matches!(self, Self::Failed)
    }

    pub const fn all_received(self) -> bool {
        matches!(self, Self::AllReceived)
    }
}

/// Key of a sequence record entry.
pub trait SeqKey: Clone + PartialEq {
    fn is_unused(&self) -> bool;
}

impl SeqKey for Hsmn {
    fn is_unused(&self) -> bool {
        !self.is_defined()
    }
}

impl SeqKey for MsgId {
    fn is_unused(&self) -> bool {
        self.is_empty()
    }
}

/// Fixed-capacity map from destination key to expected sequence number.
#[derive(Debug, Clone)]
pub struct SeqRec<K, const N: usize> {
    entries: Vec<(K, Sequence), N>,
}

/// Record keyed by HSM number, used by event requests.
pub type EvtSeqRec = SeqRec<Hsmn, 16>;
/// Record keyed by message peer, used by message requests.
pub type MsgSeqRec = SeqRec<MsgId, 8>;

impl<K: SeqKey, const N: usize> Default for SeqRec<K, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SeqKey, const N: usize> SeqRec<K, N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Saves the expected sequence for `key`, replacing any earlier one.
    ///
    /// # Panics
    ///
    /// Panics if `key` is the unused key or the record is full.
    pub fn save(&mut self, key: K, seq: Sequence, reset: bool) {
        assert!(!key.is_unused(), "cannot save a sequence for the unused key");
        if reset {
            self.reset();
        }
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = seq;
            return;
        }
        if self.entries.push((key, seq)).is_err() {
            panic!("sequence record of {} entries overflowed", N);
        }
    }

    /// Clears the entry for `key` if it expects `seq`.
    pub fn match_and_clear(&mut self, key: &K, seq: Sequence) -> bool {
        match self.entries.iter().position(|(k, s)| k == key && *s == seq) {
            Some(i) => {
                self.entries.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, key: &K) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn is_cleared(&self, key: &K) -> bool {
        !self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn is_all_cleared(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn expected(&self, key: &K) -> Option<Sequence> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| *s)
    }

    pub fn outstanding(&self) -> usize {
        self.entries.len()
    }

    /// Checks a confirmation from `key` carrying `seq` and a success flag.
    pub fn check(&mut self, key: &K, seq: Sequence, success: bool) -> CfmOutcome {
        if !self.match_and_clear(key, seq) {
            return CfmOutcome::Ignored;
        }
        if !success {
            CfmOutcome::Failed
        } else if self.is_all_cleared() {
            CfmOutcome::AllReceived
        } else {
            CfmOutcome::Pending
        }
    }

    /// [`check`](Self::check) with an [`ErrorCode`].
    pub fn check_code(&mut self, key: &K, seq: Sequence, error: ErrorCode) -> CfmOutcome {
        self.check(key, seq, error.is_success())
    }
}
