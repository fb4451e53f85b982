// ============================================================
// Layer 4 — Token Batcher
// ============================================================
// Converts a Vec of variable-length token sequences into
// framework-ready tensors:
//
//   Input:  N sequences, lengths l_1 .. l_N
//   Output: TokenBatch with
//             input_ids [N, max(l_i)]   right-padded with <pad> = 0
//             mask      [N, max(l_i)]   true on padding
//
// The mask is derived from the padded ids exactly as every encoder
// expects it (`ids == 0`), so a sequence that contains token 0 in
// the middle is masked there as well.

use burn::prelude::*;
use rand::Rng;

use crate::ml::base_encoder::{pad_mask, PAD_ID};

/// A padded batch of token sequences.
#[derive(Debug, Clone)]
pub struct TokenBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Padding mask — shape: [batch_size, seq_len], true = padding
    pub mask: Tensor<B, 2, Bool>,
}

/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct TokenBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TokenBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Pad every sequence to the longest one and build the mask.
    pub fn batch(&self, items: Vec<Vec<u32>>) -> TokenBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.iter().map(Vec::len).max().unwrap_or(0);

        let flat: Vec<i32> = items
            .iter()
            .flat_map(|s| {
                s.iter()
                    .map(|&x| x as i32)
                    .chain(std::iter::repeat(PAD_ID as i32).take(seq_len - s.len()))
            })
            .collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let mask = pad_mask(&input_ids);

        TokenBatch { input_ids, mask }
    }
}

/// `batch_size` random sequences of length `1..=max_len` over token
/// ids `1..vocab_size` (0 is reserved for padding).
pub fn random_sequences<R: Rng>(
    rng:        &mut R,
    batch_size: usize,
    max_len:    usize,
    vocab_size: usize,
) -> Vec<Vec<u32>> {
    (0..batch_size)
        .map(|_| {
            let len = rng.gen_range(1..=max_len.max(1));
            (0..len)
                .map(|_| rng.gen_range(1..vocab_size.max(2)) as u32)
                .collect()
        })
        .collect()
}
