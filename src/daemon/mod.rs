//! Daemon control - process invocation, the BIRD control seam, and the
//! reload orchestrator with rollback.

pub mod control;
pub mod invoke;
pub mod reload;


pub use control::{BirdControl, DaemonControl, DaemonState};
pub use invoke::{invoke, Invocation};
pub use reload::{ReloadOrchestrator, ReloadOutcome};
