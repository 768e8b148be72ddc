pub mod assignments;
pub mod candidates;
pub mod history;
pub mod migrations;
pub mod pool;
pub mod util;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use assignments::{
    AssignmentStoreError, NewAssignmentRequest, PendingAssignment, approve_assignment,
    create_assignment_request, fetch_pending_assignments, reject_assignment,
};
pub use candidates::{CandidateFetchError, fetch_eligible_developer_ids, fetch_role_candidates};
pub use history::{HistoryStoreError, fetch_role_history};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPoolError, PgPool, create_pool_from_url};
