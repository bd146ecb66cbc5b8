//! CLI command definitions for the `chatlog` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod indexes;
pub mod messages;

use chatlog_types::message::MessageRole;
use clap::{Parser, Subcommand};

/// Default for `recent --limit`: effectively the whole conversation.
pub const DEFAULT_RECENT_LIMIT: i64 = i32::MAX as i64;

/// Persist and query conversation history.
#[derive(Parser)]
#[command(name = "chatlog", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or reconcile indexes, even if `create-indexes` is off.
    Init,

    /// Append messages to a conversation.
    Append {
        /// Conversation id.
        #[arg(short, long)]
        conversation: String,

        /// Role of the messages (user, assistant, system).
        #[arg(short, long, default_value = "user")]
        role: MessageRole,

        /// Message texts; more than one is appended as a single batch.
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Show the most recent messages of a conversation, oldest first.
    Recent {
        /// Conversation id.
        #[arg(short, long)]
        conversation: String,

        /// Maximum number of messages.
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Delete every message of a conversation.
    Clear {
        /// Conversation id.
        #[arg(short, long)]
        conversation: String,
    },

    /// Remove expired records once.
    Purge,

    /// Keep removing expired records until interrupted.
    Watch {
        /// Seconds between sweeps.
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}

impl Cli {
    /// Log filter directives for the chosen verbosity.
    pub fn log_directives(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,chatlog_core=debug,chatlog_infra=debug",
            _ => "trace",
        }
    }
}
