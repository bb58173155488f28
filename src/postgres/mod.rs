//! Postgres-backed repository implementations.
//!
//! Each repository owns a clone of the connection pool. Queries go through
//! `query_as` with explicit `FromRow` record structs so the table shapes are
//! checked in one place per module.

mod audit_log;
mod invite;
mod membership;
pub mod migrations;
mod practice;
mod profile;
mod purge;

pub use audit_log::PostgresAuditLogRepository;
pub use invite::PostgresInviteRepository;
pub use membership::PostgresMembershipRepository;
pub use practice::PostgresPracticeRepository;
pub use profile::PostgresProfileRepository;
pub use purge::PostgresUserPurgeRepository;

use sqlx::PgPool;

use crate::policy::MemberRole;
use crate::ActionError;

/// Creates all Postgres repository instances from a connection pool.
pub fn create_repositories(
    pool: PgPool,
) -> (
    PostgresPracticeRepository,
    PostgresMembershipRepository,
    PostgresInviteRepository,
    PostgresProfileRepository,
    PostgresUserPurgeRepository,
    PostgresAuditLogRepository,
) {
    (
        PostgresPracticeRepository::new(pool.clone()),
        PostgresMembershipRepository::new(pool.clone()),
        PostgresInviteRepository::new(pool.clone()),
        PostgresProfileRepository::new(pool.clone()),
        PostgresUserPurgeRepository::new(pool.clone()),
        PostgresAuditLogRepository::new(pool),
    )
}

fn parse_role(s: &str) -> Result<MemberRole, ActionError> {
    MemberRole::from_str(s)
        .ok_or_else(|| ActionError::Database(format!("unknown member role \"{s}\"")))
}
