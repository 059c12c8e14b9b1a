//! Typed precondition errors.
//!
//! Most failures travel as `anyhow::Error` with context attached. The
//! variants here are the ones callers (and tests) need to tell apart, so they
//! are raised as `StoreError` and recovered with `downcast_ref`.

/// Errors raised before any mutation of the store or live workspace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("context '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("no current context is set (run 'clusterctx checkout <name>' first)")]
    NoCurrentProfile,

    #[error("invalid context name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{0} aborted by operator")]
    Aborted(&'static str),

    #[error("inventory file not found: {0}")]
    MissingInventory(String),
}
