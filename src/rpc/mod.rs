//! JSON-RPC over newline-delimited streams.
//!
//! - `codec.rs`      -- message types, line decode/encode
//! - `writer.rs`     -- lock-guarded output stream + chunk emitter
//! - `dispatcher.rs` -- method routing and the serve loop

pub mod codec;
pub mod dispatcher;
pub mod writer;

pub use dispatcher::{Dispatcher, ServeOutcome};
