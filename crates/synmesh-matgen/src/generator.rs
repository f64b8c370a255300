//! Packed-row emission.

use crate::connector::ConnectorGenerator;
use crate::error::{MatGenError, Result};
use crate::param::ParamGenerator;
use rand::RngCore;
use synmesh_core::row::{
    halfwords_to_words, write_halfword, StandardCodec, PLASTIC_HEADER_WORDS, STATIC_HEADER_WORDS,
};
use synmesh_core::Trace;
use tracing::{debug, trace};

/// Widest row any core configuration supports, in synapses.
pub const MAX_ROW_SYNAPSES: usize = 1024;

/// Delay field ceiling of the reference codec: larger generated delays
/// are clamped (the generator does not emit delay-extension rows).
const MAX_NATIVE_DELAY: u32 = StandardCodec::DELAY_MASK;

/// Emits packed synaptic rows at a fixed stride.
#[derive(Debug, Clone, Copy)]
pub struct MatrixGenerator {
    num_rows: u32,
    max_row_synapses: usize,
    weight_fixed_point: u32,
    post_count: u32,
}

impl MatrixGenerator {
    /// Create a generator for `num_rows` rows of up to `max_row_synapses`
    /// synapses over `post_count` post-neurons.
    ///
    /// # Errors
    ///
    /// Fails if `max_row_synapses` exceeds [`MAX_ROW_SYNAPSES`] or either
    /// dimension is zero.
    pub fn new(
        num_rows: u32,
        max_row_synapses: usize,
        weight_fixed_point: u32,
        post_count: u32,
    ) -> Result<Self> {
        if max_row_synapses == 0 || max_row_synapses > MAX_ROW_SYNAPSES {
            return Err(MatGenError::invalid_parameter(format!(
                "max_row_synapses {max_row_synapses} outside 1..={MAX_ROW_SYNAPSES}"
            )));
        }
        if num_rows == 0 || post_count == 0 {
            return Err(MatGenError::invalid_parameter(
                "matrix needs at least one row and one post-neuron",
            ));
        }
        Ok(Self {
            num_rows,
            max_row_synapses,
            weight_fixed_point,
            post_count,
        })
    }

    /// Word stride of a static row.
    #[must_use]
    pub fn static_row_words(&self) -> usize {
        STATIC_HEADER_WORDS + self.max_row_synapses
    }

    /// Word stride of a plastic row with `pre_trace_words` of trace
    /// payload.
    #[must_use]
    pub fn plastic_row_words(&self, pre_trace_words: usize) -> usize {
        PLASTIC_HEADER_WORDS + pre_trace_words + 2 * halfwords_to_words(self.max_row_synapses)
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    fn generate_row_values(
        &self,
        row: u32,
        connector: &dyn ConnectorGenerator,
        delay_gen: &dyn ParamGenerator,
        weight_gen: &dyn ParamGenerator,
        rng: &mut dyn RngCore,
    ) -> Result<(Vec<u32>, Vec<i32>, Vec<i32>)> {
        let indices = connector.generate(row, self.max_row_synapses, self.post_count, rng);
        if indices.len() > self.max_row_synapses {
            return Err(MatGenError::RowOverflow {
                row,
                generated: indices.len(),
                limit: self.max_row_synapses,
            });
        }
        let delays = delay_gen.generate(indices.len(), 0, rng);
        let weights = weight_gen.generate(indices.len(), self.weight_fixed_point, rng);
        trace!(row, synapses = indices.len(), "row generated");
        Ok((indices, delays, weights))
    }

    /// Generate a static matrix: per row a `{N, 0, 0}` header, `N` packed
    /// synaptic words, then a cursor advance to the fixed stride. Padding
    /// words are never written; readers honour `N`.
    ///
    /// # Errors
    ///
    /// Fails if a connector overflows a row.
    pub fn generate_static(
        &self,
        connector: &dyn ConnectorGenerator,
        delay_gen: &dyn ParamGenerator,
        weight_gen: &dyn ParamGenerator,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<u32>> {
        let stride = self.static_row_words();
        let mut matrix = vec![0u32; self.num_rows as usize * stride];
        let mut cursor = 0usize;

        for row in 0..self.num_rows {
            let (indices, delays, weights) =
                self.generate_row_values(row, connector, delay_gen, weight_gen, rng)?;

            matrix[cursor] = indices.len() as u32;
            // Delay extension unsupported here: both header words stay zero
            for (j, &index) in indices.iter().enumerate() {
                let delay = (delays[j].max(1) as u32).min(MAX_NATIVE_DELAY);
                matrix[cursor + STATIC_HEADER_WORDS + j] =
                    StandardCodec::encode(index, delay, weights[j] as u32);
            }

            // Advance past the padding to keep the fixed stride
            cursor += stride;
        }

        debug!(
            rows = self.num_rows,
            words = matrix.len(),
            "static matrix generated"
        );
        Ok(matrix)
    }

    /// Generate a plastic matrix in the five-word-header layout: zeroed
    /// update ticks and pre-trace, packed 16-bit weights, packed 16-bit
    /// control words.
    ///
    /// # Errors
    ///
    /// Fails if a connector overflows a row.
    pub fn generate_plastic<T: Trace>(
        &self,
        connector: &dyn ConnectorGenerator,
        delay_gen: &dyn ParamGenerator,
        weight_gen: &dyn ParamGenerator,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<u32>> {
        let stride = self.plastic_row_words(T::WORDS);
        let mut matrix = vec![0u32; self.num_rows as usize * stride];
        let mut cursor = 0usize;

        for row in 0..self.num_rows {
            let (indices, delays, weights) =
                self.generate_row_values(row, connector, delay_gen, weight_gen, rng)?;

            matrix[cursor] = indices.len() as u32;
            // Update ticks and the pre-trace start zeroed; the kernel owns
            // them from the first visit on
            let plastic_offset = cursor + PLASTIC_HEADER_WORDS + T::WORDS;
            let control_offset = plastic_offset + halfwords_to_words(indices.len());
            for (j, &index) in indices.iter().enumerate() {
                let delay = (delays[j].max(1) as u32).min(MAX_NATIVE_DELAY);
                write_halfword(&mut matrix[plastic_offset..], j, weights[j] as u16);
                write_halfword(
                    &mut matrix[control_offset..],
                    j,
                    StandardCodec::encode(index, delay, 0) as u16,
                );
            }

            cursor += stride;
        }

        debug!(
            rows = self.num_rows,
            words = matrix.len(),
            "plastic matrix generated"
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{AllToAll, FixedProbability, OneToOne};
    use crate::param::Constant;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use synmesh_core::row::read_halfword;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xFEED)
    }

    #[test]
    fn static_output_advances_by_fixed_stride() {
        let generator = MatrixGenerator::new(7, 16, 8, 5).unwrap();
        let matrix = generator
            .generate_static(&OneToOne, &Constant::new(1.0), &Constant::new(0.5), &mut rng())
            .unwrap();
        // R rows of (3 + M) words, regardless of how sparse the rows are
        assert_eq!(matrix.len(), 7 * (3 + 16));
    }

    #[test]
    fn padding_left_untouched() {
        // One synapse in a 4-slot row: the trailing advance must move the
        // cursor, not add to the last synaptic word
        let generator = MatrixGenerator::new(2, 4, 0, 8).unwrap();
        let matrix = generator
            .generate_static(&OneToOne, &Constant::new(1.0), &Constant::new(3.0), &mut rng())
            .unwrap();

        let stride = generator.static_row_words();
        let word = StandardCodec::encode(0, 1, 3);
        assert_eq!(matrix[0], 1);
        assert_eq!(matrix[3], word);
        assert_eq!(&matrix[4..stride], &[0, 0, 0]);

        // Second row starts exactly one stride in, with its own synapse
        assert_eq!(matrix[stride], 1);
        assert_eq!(matrix[stride + 3], StandardCodec::encode(1, 1, 3));
    }

    #[test]
    fn delays_clamped_to_native_field() {
        let generator = MatrixGenerator::new(1, 4, 0, 4).unwrap();
        let matrix = generator
            .generate_static(
                &OneToOne,
                &Constant::new(250.0),
                &Constant::new(1.0),
                &mut rng(),
            )
            .unwrap();
        assert_eq!(StandardCodec::delay(matrix[3]), MAX_NATIVE_DELAY);
    }

    #[test]
    fn weights_use_fixed_point() {
        let generator = MatrixGenerator::new(1, 4, 11, 4).unwrap();
        let matrix = generator
            .generate_static(&OneToOne, &Constant::new(1.0), &Constant::new(0.5), &mut rng())
            .unwrap();
        assert_eq!(StandardCodec::weight(matrix[3]), 1 << 10);
    }

    #[test]
    fn plastic_layout_round_trips() {
        let generator = MatrixGenerator::new(1, 8, 4, 8).unwrap();
        let matrix = generator
            .generate_plastic::<u16>(
                &AllToAll::new(),
                &Constant::new(2.0),
                &Constant::new(1.0),
                &mut rng(),
            )
            .unwrap();

        assert_eq!(matrix.len(), generator.plastic_row_words(1));
        assert_eq!(matrix[0], 8);
        // Header tail and pre-trace zeroed
        assert_eq!(&matrix[1..6], &[0, 0, 0, 0, 0]);

        let plastic_offset = PLASTIC_HEADER_WORDS + 1;
        let control_offset = plastic_offset + 4;
        for j in 0..8 {
            assert_eq!(read_halfword(&matrix[plastic_offset..], j), 1 << 4);
            let control = u32::from(read_halfword(&matrix[control_offset..], j));
            assert_eq!(StandardCodec::index(control), j as u32);
            assert_eq!(StandardCodec::delay(control), 2);
        }
    }

    #[test]
    fn plastic_stride_is_fixed() {
        let generator = MatrixGenerator::new(5, 9, 4, 16).unwrap();
        let sparse = FixedProbability::new(0.3, true).unwrap();
        let matrix = generator
            .generate_plastic::<()>(
                &sparse,
                &Constant::new(1.0),
                &Constant::new(1.0),
                &mut rng(),
            )
            .unwrap();
        assert_eq!(matrix.len(), 5 * generator.plastic_row_words(0));
    }

    #[test]
    fn overflowing_connector_rejected() {
        struct TooMany;
        impl ConnectorGenerator for TooMany {
            fn generate(
                &self,
                _row: u32,
                max_synapses: usize,
                _post_count: u32,
                _rng: &mut dyn RngCore,
            ) -> Vec<u32> {
                vec![0; max_synapses + 1]
            }
        }

        let generator = MatrixGenerator::new(1, 4, 0, 4).unwrap();
        let result = generator.generate_static(
            &TooMany,
            &Constant::new(1.0),
            &Constant::new(1.0),
            &mut rng(),
        );
        assert!(matches!(result, Err(MatGenError::RowOverflow { .. })));
    }
}
