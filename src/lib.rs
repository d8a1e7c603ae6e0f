// Library exports for the career-chat rendering pipeline
//
// # Mutex Usage Policy
//
//   - `parking_lot::Mutex` guards sync-only state (adapter placements, the
//     in-memory host, the debug logger). Never hold a guard across `.await`;
//     scope the lock in a block before awaiting.
//
//   - `tokio::sync::OnceCell` holds the shared diagram engine so concurrent
//     first uses await a single load.

/// Crate version, for log headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod config;
pub mod diagrams;
pub mod http;
pub mod markdown;
pub mod message;
pub mod view;
