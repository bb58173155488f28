//! Workflow actions.
//!
//! Each workflow is an action struct generic over the repository and
//! provider traits it composes. Every invocation is an independent
//! request-scoped unit of work: authorization and validation run before any
//! I/O, provider mutations precede store mutations for destructive flows,
//! and privileged actions append an audit entry before reporting.

mod ban_user;
mod change_member_role;
mod create_practice;
mod delete_user;
mod invite_member;
mod send_password_reset;
mod update_practice;
mod update_profile;

pub use ban_user::{BanMode, BanUserAction};
pub use change_member_role::{
    ChangeMemberRoleAction, ChangeMemberRoleInput, RoleChangeOrigin, RoleChangeOutcome,
};
pub use create_practice::{CreatePracticeAction, CreatePracticeInput};
pub use delete_user::DeleteUserAction;
pub use invite_member::{
    InviteMemberAction, InviteMemberConfig, InviteMemberInput, InviteOutcome,
};
pub use send_password_reset::{SendPasswordResetAction, SendPasswordResetConfig};
pub use update_practice::UpdatePracticeAction;
pub use update_profile::UpdateProfileAction;
