pub mod family;
pub mod identity;
pub mod outcome;
pub mod payload;
pub mod report;
