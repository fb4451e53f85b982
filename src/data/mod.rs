// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Token sequences in, framework-ready tensors out:
//
//   Vec<Vec<u32>>   (random_sequences, or any tokenizer)
//       │
//       ▼
//   TokenBatcher    → input_ids [batch, seq] + padding mask

/// Pads token sequences into tensor batches
pub mod batcher;
