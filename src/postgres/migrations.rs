//! Database migrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use archibill::postgres::migrations;
//! use sqlx::PgPool;
//!
//! async fn setup_database(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//!     migrations::run_core(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::PgPool;

/// Runs the tenant-model migrations.
///
/// This includes tables for:
/// - `practices`
/// - `profiles`
/// - `practice_members`
/// - `practice_invites`
/// - `admin_audit_logs`
pub async fn run_core(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations/core").run(pool).await
}
