//! Command-line surface of the Tree of Approach research tool.
//!
//! The `toa` binary loads a persisted case index and exposes retrieval,
//! cited answers, petition drafting, and approach research as subcommands.

pub mod args;
pub mod commands;
pub mod input;

pub use args::{Cli, Commands, EmbedderKind, EngineArgs, LogFormat, ProviderArgs};
pub use commands::run;
