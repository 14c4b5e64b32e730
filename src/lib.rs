//! Line-delimited JSON-RPC tool server.
//!
//! Architecture:
//! - `rpc/`     -- codec, serialized output writer, method dispatcher
//! - `tools/`   -- tool registry, executor, and the built-in tools
//! - `config`   -- server configuration (JSON file + env overrides)
//! - `logging`  -- tracing subscriber setup (stderr + optional rolling file)
//! - `transport` -- stdio and TCP entry points

pub mod config;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod tools;
pub mod transport;
