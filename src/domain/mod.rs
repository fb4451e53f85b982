// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the encoder family without
// touching the tensor framework:
//
//   mode.rs      — RunMode, the explicit train / eval switch that
//                  every forward pass receives as an argument
//
//   partition.rs — LayerPartition, the positional slicing of a
//                  flat layer list into Layer-Groups + Flat stack
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums and functions

/// Explicit training / inference mode
pub mod mode;

/// Positional partition of `num_layer` layers into groups and a tail
pub mod partition;
