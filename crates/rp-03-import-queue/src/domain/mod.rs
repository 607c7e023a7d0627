pub mod apply;
pub mod claim;
pub mod limits;
pub mod state;
