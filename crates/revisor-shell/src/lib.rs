//! The signed-in user's workspace: upload code, run the review agents, ask
//! follow-up questions, and download the result.
//!
//! [`InteractionShell`] holds the per-user state and can only be built from
//! an authorized [`revisor_auth::Session`]. [`repl::run`] puts a login prompt
//! and a command loop in front of it.

pub mod render;
pub mod repl;
mod shell;

pub use render::{DownloadArtifact, RenderedResult};
pub use repl::ReplOptions;
pub use shell::{InteractionShell, ShellServices};
