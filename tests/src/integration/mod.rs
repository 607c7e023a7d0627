//! Cross-subsystem scenarios.

pub mod harness;

mod guard_flows;
mod intake_flows;
mod provisioning_flows;
