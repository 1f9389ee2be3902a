// lib.rs - Module tree for the highlighter server.
//
// main.rs only parses arguments and starts the server from `backend`.

pub mod backend;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod connection;
pub mod decorations;
pub mod dispatcher;
pub mod document_set;
pub mod editor;
pub mod highlight;
pub mod projection;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod text_store;
pub mod utf16;
pub mod vault;
pub mod workspace;

// test_utils is available in test builds and when the `test-support` feature is enabled,
// so benchmarks can drive the dispatcher with recording fakes.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
