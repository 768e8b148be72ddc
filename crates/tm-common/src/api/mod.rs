pub mod assignments;
pub mod candidates;
pub mod history;
