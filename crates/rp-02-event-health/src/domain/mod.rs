pub mod frequency;
pub mod health;
