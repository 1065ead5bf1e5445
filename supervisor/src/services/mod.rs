//! Service implementations
//!
//! Real implementations of the supervisor traits plus the process handle
//! they are built on. These handle actual I/O: spawning, signaling, log
//! capture, and network probes.

pub mod process_handle;
pub mod prober;
pub mod supervisor;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use process_handle::{ExitEvent, ProcessHandle, SpawnSpec};
pub use prober::RealHealthProber;
pub use supervisor::RecommenderSupervisor;
