
use bitvec::prelude::*;

/// A fixed-length shift register holding recency-ordered history.
///
/// Bit 0 is always the most recent entry. Used both for global outcome
/// history (one bit per branch) and for path history (a few low-order
/// address bits per branch).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the most-significant (index n) and the rightmost
// bit is the least-significant (index 0).
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Return the value of bit 'idx' (0 is the most recent).
    pub fn bit(&self, idx: usize) -> bool {
        self.data.get(idx).map(|b| *b).unwrap_or(false)
    }
}

impl HistoryRegister {
    /// Shift the register by 'n' bits.
    /// The bottom 'n' bits become zero, and the top 'n' bits are discarded.
    pub fn shift_by(&mut self, n: usize) {
        if n >= self.len {
            self.data.fill(false);
        } else {
            self.data.shift_right(n);
        }
    }

    /// Shift in a single bit (i.e. a branch outcome).
    pub fn push(&mut self, bit: bool) {
        self.shift_by(1);
        if self.len > 0 {
            self.data.set(0, bit);
        }
    }

    /// Shift in the low 'n' bits of 'value'.
    pub fn push_bits(&mut self, n: usize, value: usize) {
        let n = n.min(self.len).min(usize::BITS as usize);
        if n == 0 {
            return;
        }
        self.shift_by(n);
        let mask = if n == usize::BITS as usize { usize::MAX } else { (1 << n) - 1 };
        self.data[..n].store::<usize>(value & mask);
    }

    /// Read 'bits' bits starting at 'offset' as an integer.
    /// Bits beyond the end of the register read as zero.
    pub fn segment(&self, offset: usize, bits: usize) -> usize {
        let end = (offset + bits).min(self.len);
        if offset >= end {
            return 0;
        }
        let width = (end - offset).min(usize::BITS as usize);
        self.data[offset..offset + width].load::<usize>()
    }

    /// Read as many of the most recent bits as fit into a [usize].
    pub fn low_bits(&self) -> usize {
        self.segment(0, usize::BITS as usize)
    }
}
