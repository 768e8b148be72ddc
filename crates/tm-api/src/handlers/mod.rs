pub mod assignments;
pub mod candidates;
pub mod developers;
pub mod health;
