//! Fixed-capacity send window buffer.
//!
//! Slots are addressed by `seq_num % capacity`.  The buffer itself knows
//! nothing about `base` or `next_seq`; the sender's window invariant
//! (`next_seq - base ≤ capacity`) is what guarantees a slot is never
//! overwritten while its datagram is still unacknowledged.
//!
//! ```text
//!  seq:   5   6   7   8          capacity = 4
//!  slot:  1   2   3   0
//! ```

use crate::packet::Datagram;

#[derive(Debug)]
pub struct SendWindow {
    /// Allocated once at construction; never grows.
    slots: Box<[Datagram]>,
}

impl SendWindow {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            slots: vec![Datagram::default(); capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `datagram` in the slot for `seq_num`, overwriting what was there.
    pub fn put(&mut self, seq_num: u32, datagram: Datagram) {
        let slot = self.slot(seq_num);
        self.slots[slot] = datagram;
    }

    /// The datagram last stored in the slot for `seq_num`.
    pub fn get(&self, seq_num: u32) -> &Datagram {
        &self.slots[self.slot(seq_num)]
    }

    fn slot(&self, seq_num: u32) -> usize {
        seq_num as usize % self.slots.len()
    }
}
