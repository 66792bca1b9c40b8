// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain structs, enums, and error types
//
// Why keep this layer pure?
//   - Easy to unit test (no backend needed)
//   - Easy to understand (no framework noise)
//
// Reference: Rust Book §5 (Structs), §9 (Error Handling)

// Solver error types and the SolverResult alias
pub mod error;

// The padding contract shared by solvers and pretrainers
pub mod max_lengths;
