//! Global history and folded history registers.

use bitvec::prelude::*;
use std::ops::RangeInclusive;
use crate::Outcome;

/// A register of resolved branch outcomes.
///
/// Bit 0 is the most recent outcome, and bit 'k' is the outcome resolved
/// 'k' updates ago. Bits shifted past the end of the register are discarded.
#[derive(Clone, Debug)]
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the oldest (index n) and the rightmost bit is
// the newest (index 0).
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
        assert!(len > 0);
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn data(&self) -> &BitSlice<usize, Lsb0> { self.data.as_bitslice() }

    /// Return the most recent outcome.
    pub fn newest(&self) -> bool { self.data[0] }

    /// Return the outcome resolved 'n' updates ago.
    pub fn get(&self, n: usize) -> bool { self.data[n] }
}

impl HistoryRegister {
    /// Shift the register by 'n' bits.
    /// The bottom 'n' bits become zero, and the top 'n' bits are discarded.
    pub fn shift_by(&mut self, n: usize) {
        self.data.shift_right(n);
    }

    /// Shift a new outcome into the register.
    pub fn push(&mut self, outcome: Outcome) {
        self.shift_by(1);
        self.data.set(0, outcome.into());
    }

    /// Return some slice of bits.
    pub fn read(&self, range: RangeInclusive<usize>) -> &BitSlice<usize, Lsb0> {
        &self.data[range]
    }

    /// Fold [with XOR] some slice of bits.
    pub fn fold(&self, range: RangeInclusive<usize>, output_bits: usize)
        -> usize
    {
        let output_mask = (1 << output_bits) - 1;
        let slice = &self.data[range];
        let res = slice.chunks(output_bits).fold(0, |res, x| {
            res ^ x.load_le::<usize>()
        });
        res & output_mask
    }
}

/// A circular shift register used to track folded history.
///
/// This folds the newest 'history_len' bits of global history into 'size'
/// bits, but without the need to actually read all of the history bits and
/// fold them all together with XOR. After every update, the output is
/// equivalent to [`HistoryRegister::fold`] over `0..=history_len-1`.
///
/// NOTE: This only works when global history is shifted by one bit before
/// each call to [`FoldedHistoryRegister::update`].
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    data: BitVec<usize, Lsb0>,

    /// The size of the output [in bits].
    output_size: usize,

    /// The number of global history bits being folded.
    history_len: usize,
}
impl FoldedHistoryRegister {
    pub fn new(output_size: usize, history_len: usize) -> Self {
        assert!(output_size > 0 && output_size <= usize::BITS as usize);
        Self {
            data: bitvec![usize, Lsb0; 0; output_size],
            output_size,
            history_len,
        }
    }

    pub fn output_size(&self) -> usize { self.output_size }
    pub fn history_len(&self) -> usize { self.history_len }

    /// Return the folded history as a [usize].
    pub fn output_usize(&self) -> usize { self.data.load_le::<usize>() }

    /// Using some [HistoryRegister] (which has just been shifted by one bit),
    /// update the folded history.
    pub fn update(&mut self, ghr: &HistoryRegister) {
        // Rotate by one bit: the most-significant bit wraps around to bit 0
        self.data.rotate_right(1);

        // The newest history bit is XOR'ed into the bit that wrapped around
        let first_bit = self.data[0] ^ ghr.newest();
        self.data.set(0, first_bit);

        // The bit that just left the window is XOR'ed back out
        let index = self.history_len % self.output_size;
        let last_bit = self.data[index] ^ ghr.get(self.history_len);
        self.data.set(index, last_bit);
    }
}
