// Compact 1-bit-per-cluster bitmap, sized up to 2^28 clusters (FAT32).
//
// Mirrors the `long_bitmap_t` used by the reference checker: one machine
// word per WORD_BITS clusters, plus a running popcount so callers don't
// have to rescan the whole map to answer "how many heads are left".

use fatfsck_core::{FsckError, FsckResult};

/// Bits per machine word; also the granularity `word_is_empty` skips by.
pub const WORD_BITS: usize = usize::BITS as usize;

/// Whether a freshly constructed bitmap starts all-zero or all-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initial {
    AllZero,
    AllOne,
}

/// A bitmap over cluster numbers, word-aligned so `word_is_empty` never
/// needs a bounds check on the last word.
#[derive(Debug, Clone)]
pub struct Bitmap {
    words: Vec<usize>,
    bits: usize,
    count: usize,
}

impl Bitmap {
    /// Allocate a bitmap covering `bits` cluster numbers.
    pub fn new(bits: usize, initial: Initial) -> FsckResult<Self> {
        let word_count = bits.div_ceil(WORD_BITS);
        let fill = match initial {
            Initial::AllOne => !0usize,
            Initial::AllZero => 0usize,
        };
        let mut words = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| FsckError::Fatal(format!("no space for cluster bitmap ({word_count} words)")))?;
        words.resize(word_count, fill);
        let count = match initial {
            Initial::AllOne => bits,
            Initial::AllZero => 0,
        };
        Ok(Bitmap { words, bits, count })
    }

    /// Set bit `i`. `i` must currently be clear; setting an already-set
    /// bit is a programming error.
    pub fn set(&mut self, i: usize) {
        let (word, mask) = self.locate(i);
        assert_eq!(self.words[word] & mask, 0, "bit {i} already set");
        self.words[word] |= mask;
        self.count += 1;
    }

    /// Clear bit `i`. `i` must currently be set; clearing an already-clear
    /// bit is a programming error.
    pub fn clear(&mut self, i: usize) {
        let (word, mask) = self.locate(i);
        assert_ne!(self.words[word] & mask, 0, "bit {i} already clear");
        self.words[word] &= !mask;
        self.count -= 1;
    }

    /// Test bit `i`.
    pub fn test(&self, i: usize) -> bool {
        let (word, mask) = self.locate(i);
        (self.words[word] & mask) != 0
    }

    /// True iff the whole machine word containing bit `i` is zero. Lets
    /// callers fast-skip a full word of sparse clusters at once.
    pub fn word_is_empty(&self, i: usize) -> bool {
        let (word, _) = self.locate(i);
        self.words[word] == 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.count
    }

    fn locate(&self, i: usize) -> (usize, usize) {
        assert!(i < self.bits, "bit index {i} out of range ({} bits)", self.bits);
        (i / WORD_BITS, 1usize << (i % WORD_BITS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_starts_empty() {
        let bm = Bitmap::new(200, Initial::AllZero).unwrap();
        assert_eq!(bm.count(), 0);
        assert!(!bm.test(5));
    }

    #[test]
    fn all_one_starts_full() {
        let bm = Bitmap::new(200, Initial::AllOne).unwrap();
        assert_eq!(bm.count(), 200);
        assert!(bm.test(199));
    }

    #[test]
    fn set_clear_roundtrip() {
        let mut bm = Bitmap::new(128, Initial::AllZero).unwrap();
        bm.set(3);
        bm.set(64);
        assert_eq!(bm.count(), 2);
        assert!(bm.test(3) && bm.test(64));
        bm.clear(3);
        assert_eq!(bm.count(), 1);
        assert!(!bm.test(3));
    }

    #[test]
    #[should_panic]
    fn double_set_panics() {
        let mut bm = Bitmap::new(64, Initial::AllZero).unwrap();
        bm.set(1);
        bm.set(1);
    }

    #[test]
    #[should_panic]
    fn double_clear_panics() {
        let mut bm = Bitmap::new(64, Initial::AllOne).unwrap();
        bm.clear(1);
        bm.clear(1);
    }

    #[test]
    fn word_is_empty_tracks_the_whole_word() {
        let mut bm = Bitmap::new(256, Initial::AllZero).unwrap();
        assert!(bm.word_is_empty(0));
        bm.set(10);
        assert!(!bm.word_is_empty(0));
        assert!(bm.word_is_empty(WORD_BITS));
    }

    #[test]
    fn rounds_up_to_a_whole_word() {
        // 1 bit should still allocate a full word so word_is_empty on the
        // last word never needs a separate bounds check.
        let bm = Bitmap::new(1, Initial::AllZero).unwrap();
        assert!(bm.word_is_empty(0));
    }
}
