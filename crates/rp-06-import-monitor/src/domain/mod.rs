pub mod policy;
pub mod remote;
pub mod report;
