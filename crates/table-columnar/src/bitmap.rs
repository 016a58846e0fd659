#![forbid(unsafe_code)]

/// A compact bit vector used for missing flags and boolean payloads.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

fn words_for(bits: usize) -> usize {
    (bits + 63) / 64
}

impl BitVec {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            ones: 0,
        }
    }

    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(words_for(bits)),
            len: 0,
            ones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits that can be pushed without reallocating the word buffer.
    pub fn capacity_bits(&self) -> usize {
        self.words.capacity() * 64
    }

    pub fn reserve_bits(&mut self, additional: usize) {
        let needed = words_for(self.len + additional);
        if needed > self.words.len() {
            self.words.reserve(needed - self.words.len());
        }
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }

        if value {
            let word = self.len / 64;
            self.words[word] |= 1u64 << bit;
            self.ones += 1;
        }

        self.len += 1;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / 64];
        let bit = index % 64;
        ((word >> bit) & 1) == 1
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    /// Release spare word capacity; used when a builder seals its buffers.
    pub fn shrink_to_fit(&mut self) {
        self.words.shrink_to_fit();
    }
}

impl Default for BitVec {
    fn default() -> Self {
        Self::new()
    }
}
