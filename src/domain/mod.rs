// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the core
// concepts of the recipe: utterances on disk, the fixed-length
// segments cut from them, and the training stage.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// A recording on disk and the segments cut from it
pub mod segment;

// Training / validation stage
pub mod stage;

// Core abstractions (traits) that other layers implement
pub mod traits;
