//! On-storage synaptic row layout.
//!
//! Rows are streams of 32-bit words in the shared store. Two layouts exist:
//!
//! ```text
//! Static row                       Plastic (STDP) row
//! ──────────────────────────      ─────────────────────────────────────
//! word 0   synapse count N        word 0   synapse count N
//! word 1   delay-ext tick off     word 1   delay-ext tick offset
//! word 2   delay-ext locator      word 2   delay-ext locator
//! word 3+  N synaptic words       word 3   tick of last row update
//!          (padding to stride)    word 4   tick of last pre-spike
//!                                 word 5+  pre-trace payload
//!                                 then     N plastic halfwords (packed)
//!                                 then     N control halfwords (packed)
//! ```
//!
//! A static synaptic word packs `| weight | delay | index |` MSB→LSB with
//! `index + delay + weight = 32` bits. Control halfwords share the
//! index/delay fields in their low bits and carry no weight. The plastic
//! region (words 3 up to the control words) is mutable and written back
//! after an update; the control region is immutable after generation.

/// Word index of the synapse count in every row header.
pub const ROW_COUNT: usize = 0;
/// Word index of the delay-extension target tick offset (0 = none).
pub const ROW_EXTENSION_DELAY: usize = 1;
/// Word index of the delay-extension row locator.
pub const ROW_EXTENSION_LOCATOR: usize = 2;
/// Header words preceding the synaptic words of a static row.
pub const STATIC_HEADER_WORDS: usize = 3;
/// Word index of the last-row-update tick in a plastic row.
pub const PLASTIC_LAST_UPDATE: usize = 3;
/// Word index of the last pre-synaptic spike tick in a plastic row.
pub const PLASTIC_LAST_PRE: usize = 4;
/// Fixed header words of a plastic row, before the pre-trace payload.
pub const PLASTIC_HEADER_WORDS: usize = 5;

/// Bit-exact codec for packed synaptic words.
///
/// `I` is the post-neuron index width, `D` the dendritic delay width; the
/// weight occupies the remaining high bits. The reference configuration is
/// [`StandardCodec`] (`I = 10`, `D = 3`).
#[derive(Debug, Clone, Copy)]
pub struct SynapseCodec<const I: u32, const D: u32>;

impl<const I: u32, const D: u32> SynapseCodec<I, D> {
    /// Mask selecting the post-neuron index field.
    pub const INDEX_MASK: u32 = (1 << I) - 1;
    /// Mask selecting the delay field (after shifting by `I`).
    pub const DELAY_MASK: u32 = (1 << D) - 1;
    /// Bit position of the weight field.
    pub const WEIGHT_SHIFT: u32 = I + D;

    /// Pack `(index, delay, weight)` into one synaptic word.
    ///
    /// Caller ensures each value fits its field; excess index/delay bits
    /// are masked off, the weight is shifted into the high bits as-is.
    #[must_use]
    pub const fn encode(index: u32, delay: u32, weight: u32) -> u32 {
        (index & Self::INDEX_MASK)
            | ((delay & Self::DELAY_MASK) << I)
            | (weight << Self::WEIGHT_SHIFT)
    }

    /// Post-neuron index of a synaptic word.
    #[must_use]
    pub const fn index(word: u32) -> u32 {
        word & Self::INDEX_MASK
    }

    /// Dendritic delay of a synaptic word, in ticks.
    #[must_use]
    pub const fn delay(word: u32) -> u32 {
        (word >> I) & Self::DELAY_MASK
    }

    /// Weight field of a synaptic word.
    #[must_use]
    pub const fn weight(word: u32) -> u32 {
        word >> Self::WEIGHT_SHIFT
    }
}

/// Reference configuration: 10 index bits, 3 delay bits, 19 weight bits.
pub type StandardCodec = SynapseCodec<10, 3>;

/// Words required to hold `n` packed 16-bit halfwords.
#[must_use]
pub const fn halfwords_to_words(n: usize) -> usize {
    n.div_ceil(2)
}

/// Read the `idx`-th 16-bit halfword from a word slice.
///
/// Halfwords are packed little-endian: even indices in the low half of a
/// word, odd indices in the high half.
#[must_use]
pub fn read_halfword(words: &[u32], idx: usize) -> u16 {
    let word = words[idx / 2];
    if idx % 2 == 0 {
        word as u16
    } else {
        (word >> 16) as u16
    }
}

/// Write the `idx`-th 16-bit halfword of a word slice.
pub fn write_halfword(words: &mut [u32], idx: usize, value: u16) {
    let word = &mut words[idx / 2];
    if idx % 2 == 0 {
        *word = (*word & 0xFFFF_0000) | u32::from(value);
    } else {
        *word = (*word & 0x0000_FFFF) | (u32::from(value) << 16);
    }
}

/// Bits of a packed [`RowLocator`] holding the row word count.
pub const LOCATOR_LENGTH_BITS: u32 = 10;

const LOCATOR_LENGTH_MASK: u32 = (1 << LOCATOR_LENGTH_BITS) - 1;

/// Locates one synaptic row in the shared store: a word address plus the
/// number of words to transfer.
///
/// Packs into a single `u32` (22-bit address, 10-bit length) for the key
/// lookup table and the delay-row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocator {
    /// Word address of the row in the shared store.
    pub address: u32,
    /// Row length in words (header included).
    pub words: u32,
}

impl RowLocator {
    /// Create a locator from an address and a word count.
    #[must_use]
    pub const fn new(address: u32, words: u32) -> Self {
        Self { address, words }
    }

    /// Pack into the single-word wire form.
    #[must_use]
    pub const fn pack(self) -> u32 {
        (self.address << LOCATOR_LENGTH_BITS) | (self.words & LOCATOR_LENGTH_MASK)
    }

    /// Unpack from the single-word wire form.
    #[must_use]
    pub const fn unpack(raw: u32) -> Self {
        Self {
            address: raw >> LOCATOR_LENGTH_BITS,
            words: raw & LOCATOR_LENGTH_MASK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_codec_packs_reference_layout() {
        let word = StandardCodec::encode(5, 1, 100);
        assert_eq!(StandardCodec::index(word), 5);
        assert_eq!(StandardCodec::delay(word), 1);
        assert_eq!(StandardCodec::weight(word), 100);
        // 5 | 1 << 10 | 100 << 13
        assert_eq!(word, 5 | (1 << 10) | (100 << 13));
    }

    #[test]
    fn codec_masks_out_of_range_fields() {
        // Index and delay wider than their fields are truncated, not smeared
        let word = StandardCodec::encode(0xFFFF, 0xFF, 1);
        assert_eq!(StandardCodec::index(word), 0x3FF);
        assert_eq!(StandardCodec::delay(word), 0x7);
        assert_eq!(StandardCodec::weight(word), 1);
    }

    #[test]
    fn halfword_packing_is_little_endian() {
        let mut words = [0u32; 2];
        write_halfword(&mut words, 0, 0x1111);
        write_halfword(&mut words, 1, 0x2222);
        write_halfword(&mut words, 2, 0x3333);
        assert_eq!(words[0], 0x2222_1111);
        assert_eq!(words[1], 0x0000_3333);
        assert_eq!(read_halfword(&words, 0), 0x1111);
        assert_eq!(read_halfword(&words, 1), 0x2222);
        assert_eq!(read_halfword(&words, 2), 0x3333);
    }

    #[test]
    fn halfword_write_preserves_neighbour() {
        let mut words = [0xAAAA_BBBBu32];
        write_halfword(&mut words, 0, 0x1234);
        assert_eq!(words[0], 0xAAAA_1234);
        write_halfword(&mut words, 1, 0x5678);
        assert_eq!(words[0], 0x5678_1234);
    }

    #[test]
    fn locator_round_trip() {
        let locator = RowLocator::new(0x3_0000, 516);
        assert_eq!(RowLocator::unpack(locator.pack()), locator);
    }

    #[test]
    fn halfwords_round_up() {
        assert_eq!(halfwords_to_words(0), 0);
        assert_eq!(halfwords_to_words(1), 1);
        assert_eq!(halfwords_to_words(2), 1);
        assert_eq!(halfwords_to_words(3), 2);
    }
}
