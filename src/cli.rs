//! CLI domain: parse, route, output, and presentation only.
//! No graph logic; the route table dispatches to the store and the checker.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{map_error, CommandStatus};
pub use parse::{Cli, Commands};
pub use presentation::{format_fsck_summary_text, format_stats_text, RepoStats};
pub use route::RunContext;
