//! Git subprocess access: running commands, listing changes, resolving revisions.

pub mod changes;
pub mod command;
pub mod revision;

pub use changes::{ChangeTarget, list_changed};
pub use command::{CommandOutput, CommandRunner, GitRunner, git_available};
pub use revision::{EMPTY_TREE, latest_commit_hash, resolve_diff_base, short_rev};
