//! Property-based checks of the generator's stride contract.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use synmesh_matgen::{Constant, FixedProbability, MatrixGenerator};

proptest! {
    // After R rows at width M, the output is exactly R * (3 + M) words,
    // however sparse the connector left the rows
    #[test]
    fn static_matrix_is_exactly_stride_times_rows(
        rows in 1u32..20,
        max_synapses in 1usize..64,
        probability in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let post_count = max_synapses as u32;
        let generator = MatrixGenerator::new(rows, max_synapses, 8, post_count).unwrap();
        let connector = FixedProbability::new(probability, true).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let matrix = generator
            .generate_static(&connector, &Constant::new(1.0), &Constant::new(1.0), &mut rng)
            .unwrap();
        prop_assert_eq!(matrix.len(), rows as usize * (3 + max_synapses));
    }

    #[test]
    fn plastic_matrix_is_exactly_stride_times_rows(
        rows in 1u32..20,
        max_synapses in 1usize..64,
        seed in any::<u64>(),
    ) {
        let post_count = max_synapses as u32;
        let generator = MatrixGenerator::new(rows, max_synapses, 8, post_count).unwrap();
        let connector = FixedProbability::new(0.5, true).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let matrix = generator
            .generate_plastic::<u16>(&connector, &Constant::new(1.0), &Constant::new(1.0), &mut rng)
            .unwrap();
        prop_assert_eq!(matrix.len(), rows as usize * generator.plastic_row_words(1));
    }

    // Row headers always carry the true synapse count, never the stride
    #[test]
    fn headers_count_actual_synapses(
        rows in 1u32..10,
        seed in any::<u64>(),
    ) {
        let generator = MatrixGenerator::new(rows, 16, 8, 16).unwrap();
        let connector = FixedProbability::new(0.3, true).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let matrix = generator
            .generate_static(&connector, &Constant::new(1.0), &Constant::new(1.0), &mut rng)
            .unwrap();
        for row in 0..rows as usize {
            let base = row * (3 + 16);
            prop_assert!(matrix[base] <= 16);
        }
    }
}
