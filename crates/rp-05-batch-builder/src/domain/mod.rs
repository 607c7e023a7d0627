pub mod collector;
pub mod csv;
pub mod rows;
