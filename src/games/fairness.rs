//! Call-log hash chain
//!
//! Each round keeps a SHA-256 chain over its calls so the published draw
//! order can be checked after the fact:
//! `h0 = H("bingo-round:" || round_id)`, `h_i = H(h_{i-1} || number_i)`.

use sha2::{Digest, Sha256};

const CALL_LOG_CONTEXT: &[u8] = b"bingo-round:";

/// Running digest over a round's calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLog {
    head: [u8; 32],
    length: usize,
}

impl CallLog {
    pub fn new(round_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(CALL_LOG_CONTEXT);
        hasher.update(round_id.to_be_bytes());
        Self {
            head: hasher.finalize().into(),
            length: 0,
        }
    }

    /// Extend the chain with the next called number
    pub fn record(&mut self, number: u8) {
        let mut hasher = Sha256::new();
        hasher.update(self.head);
        hasher.update([number]);
        self.head = hasher.finalize().into();
        self.length += 1;
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.head)
    }
}

/// Recompute the chain for `numbers` and compare with a published digest
pub fn verify_call_log(round_id: u64, numbers: &[u8], digest_hex: &str) -> bool {
    let mut log = CallLog::new(round_id);
    for &n in numbers {
        log.record(n);
    }
    log.digest_hex().eq_ignore_ascii_case(digest_hex)
}
