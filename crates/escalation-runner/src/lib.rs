//! Local runner for the escalation coordinator
//!
//! Wires the coordinator to a gateway that logs instead of sending, so the
//! ladder can be rehearsed from the command line.

pub mod gateway;
pub mod scenario;
pub mod telemetry;

pub use gateway::TracingGateway;
pub use scenario::{run_scenario, Outcome, Scenario, ScenarioError, ScenarioReport};
