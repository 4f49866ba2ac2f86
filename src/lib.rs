/// Account model: usernames, secrets, database scope.
pub mod account;
/// ACL directives, the fixed account profile, and a Redis-compatible rule engine.
pub mod acl;
/// Caller-driven cancellation and deadlines for store round-trips.
pub mod cancel;
/// Settings loading (defaults, TOML file, `ACLSYNC_*` environment).
pub mod config;
/// Connection parameters and the shared store handle.
pub mod connection;
/// Account directory: exists / create / replace / delete.
pub mod directory;
/// Flexible logging (formatting, filters, file sink).
pub mod logging;
/// Lifecycle adapter: declare / observe / modify / remove / import.
pub mod reconciler;
/// ACL store abstraction with Redis and in-memory backends.
pub mod store;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Account model.
pub use account::{Account, DatabaseScope, Secret, Username, UNRESTRICTED_SENTINEL};
/// Directives and the account profile.
pub use acl::{profile_directives, render_tokens, AclCategory, Directive, DENIED_COMMANDS};
/// Cancellation.
pub use cancel::{CancelHandle, Cancellation};
/// Settings.
pub use config::Settings;
/// Connection.
pub use connection::{Connection, ConnectionParams, DEFAULT_PORT};
/// Directory.
pub use directory::AccountDirectory;
/// Lifecycle adapter and its records/diagnostics.
pub use reconciler::{AccountRecord, Diagnostic, ReconcilerAdapter, Severity};
/// Stores.
pub use store::{
    AccountDetail, AccountLookup, AclStore, EffectiveAcl, MemoryAclStore, RedisAclStore, StoreOp,
};

/// Error types.
pub use aclsync_error::{
    AclSyncResult, CancelReason, DirectoryError, ErrorExt, Operation, StackError, StatusCode,
    StoreError, StoreResult,
};
