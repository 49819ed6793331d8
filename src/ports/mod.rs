pub mod process;
pub mod reachability;

pub use process::{ExitOutcome, ProxyHandle};
pub use reachability::{AlwaysReachable, ReachabilityProbe};
