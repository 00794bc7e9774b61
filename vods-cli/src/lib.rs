//! Library target for the `vods` package.
//!
//! The primary deliverable of this package is the `vods` CLI binary
//! (`src/main.rs`). This library exists so CI can run `cargo test -p vods --doc`.

#[doc(hidden)]
pub use vods_engine;
