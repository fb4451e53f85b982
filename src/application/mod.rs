// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal per subcommand.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file access (that's Layer 6)
//   - Only workflow coordination

/// The serialisable encoder description shared by every subcommand
pub mod model_spec;

/// Structural summary of an encoder (`inspect`)
pub mod inspect_use_case;

/// One forward pass on a random batch (`probe`)
pub mod probe_use_case;
