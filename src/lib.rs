//! # archibill
//!
//! Practice membership, role authorization and administrative user-lifecycle
//! workflows for the ArchiBill practice-management platform.
//!
//! A *practice* is the tenant unit: users join it with a role
//! (owner > admin > member > viewer), owners invite new members and manage
//! roles, and site administrators can ban, reset or delete any user. Every
//! privileged action appends an entry to an append-only audit log.
//!
//! The crate is storage- and identity-provider-agnostic. Workflows are
//! action structs generic over the repository traits in [`store`], the
//! [`provider::IdentityProvider`] trait and the [`audit::AuditLogRepository`]
//! trait. In-memory mocks ship behind the (default) `mocks` feature; a
//! Postgres backing lives behind the `postgres` feature.
//!
//! ## Guarantees
//!
//! - A practice that has ever had an owner keeps at least one member with
//!   the `owner` role; demotions and deletions that would break this are
//!   rejected before any mutation ([`invariant`]).
//! - Identity-provider mutations happen before store mutations for
//!   destructive flows; store cleanup for user deletion runs as one
//!   transaction.
//! - Workflow entry points never panic on bad input; callers can convert any
//!   outcome into an [`ActionResult`] for display.

pub mod actions;
pub mod actor;
pub mod audit;
pub mod crypto;
pub mod invariant;
pub mod policy;
pub mod provider;
pub mod result;
pub mod slug;
pub mod store;
pub mod types;
pub mod validators;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use actor::Actor;
pub use audit::{AuditAction, AuditEntry, AuditLogRepository, NewAuditEntry};
pub use policy::MemberRole;
pub use provider::{IdentityProvider, IdentityUser};
pub use result::{ActionResult, ActionStatus};
pub use store::{
    CreateInvite, CreateMembership, CreatePractice, InviteRepository, MembershipRepository,
    PracticeFields, PracticeRepository, ProfileRepository, UserPurgeRepository,
};
pub use types::{MembershipSnapshot, Practice, PracticeInvite, PracticeMember, Profile};

#[cfg(feature = "mocks")]
pub use provider::MockIdentityProvider;
#[cfg(feature = "mocks")]
pub use store::MockTenantStore;

use std::fmt;

/// Errors produced by workflow actions and the adapters they compose.
///
/// Validation and authorization variants are always raised before any I/O.
/// `Provider` aborts a workflow before the store is touched; `Database`
/// rolls back whatever multi-step write was in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No resolvable actor identity.
    NotAuthenticated,
    /// The actor's role does not permit the action.
    Forbidden(String),
    /// The change would leave a practice without an owner.
    OwnerInvariant(String),
    /// Malformed input, caught before any I/O.
    Validation(String),
    /// Target membership, user or practice is absent.
    NotFound(String),
    /// Duplicate active invite or similar state clash.
    Conflict(String),
    /// The identity provider reports the email is already registered.
    /// Invite flows catch this and fall back to user lookup.
    AlreadyRegistered,
    /// The identity provider call failed for any other reason.
    Provider(String),
    /// The relational store call failed.
    Database(String),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::NotAuthenticated => write!(f, "Not authenticated"),
            ActionError::Forbidden(msg) => write!(f, "{msg}"),
            ActionError::OwnerInvariant(msg) => write!(f, "{msg}"),
            ActionError::Validation(msg) => write!(f, "{msg}"),
            ActionError::NotFound(msg) => write!(f, "{msg}"),
            ActionError::Conflict(msg) => write!(f, "{msg}"),
            ActionError::AlreadyRegistered => write!(f, "Email is already registered"),
            ActionError::Provider(msg) => write!(f, "{msg}"),
            ActionError::Database(msg) => write!(f, "Database error: {msg}"),
        }
    }
}

impl std::error::Error for ActionError {}
