// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file I/O that doesn't belong in any business layer:
//
//   config_store.rs — ModelSpec persistence as JSON, so `inspect`
//                     and `probe` rebuild exactly the encoder that
//                     `init-config` described
//
//   report.rs       — probe results appended to a CSV file for
//                     comparing specs, modes and backends

/// ModelSpec saving and loading
pub mod config_store;

/// Probe report CSV logger
pub mod report;
