//! CLI command definitions

use clap::{ArgAction, Parser, Subcommand};
use conductor_infrastructure::ApprovalPolicy;
use std::path::PathBuf;

const DEFAULT_CONVERSATION: &str = "default";

/// Turn orchestration engine
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about)]
#[command(long_about = "Runs a user task through analysis, routing, execution, \
evaluation and scoring.\n\n\
Every turn event is printed to stdout as one JSON object per line. \
Diagnostics go to stderr (raise with -v, -vv, -vvv or RUST_LOG).")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a configuration file (merged after the global and project files)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Ignore all configuration files and environment overrides
    #[arg(long, global = true, conflicts_with = "config")]
    pub no_config: bool,

    /// How approval requests are answered: interactive, auto-approve or auto-reject
    #[arg(long, value_name = "POLICY", global = true)]
    pub approval_policy: Option<ApprovalPolicy>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new turn
    Run {
        /// The task to run
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Conversation the turn belongs to
        #[arg(long, value_name = "ID", default_value = DEFAULT_CONVERSATION)]
        conversation: String,

        /// Save a checkpoint when execution starts so the turn can be resumed
        #[arg(long)]
        checkpoint: bool,
    },

    /// Resume a turn from a saved checkpoint
    Resume {
        /// Conversation the checkpoint belongs to
        #[arg(long, value_name = "ID")]
        conversation: String,

        /// Checkpoint handle printed by `run --checkpoint`
        #[arg(long, value_name = "ID")]
        checkpoint_id: String,
    },

    /// Show configuration sources and the effective configuration
    Config,
}

impl Command {
    /// The raw request this command stands for, if it runs a turn.
    pub fn raw_request(&self) -> Option<conductor_domain::RawTurnRequest> {
        match self {
            Command::Run {
                message,
                conversation,
                checkpoint,
            } => Some(conductor_domain::RawTurnRequest {
                conversation_id: Some(conversation.clone()),
                message: Some(message.join(" ")),
                checkpoint_id: None,
                enable_checkpointing: checkpoint.then_some(true),
            }),
            Command::Resume {
                conversation,
                checkpoint_id,
            } => Some(conductor_domain::RawTurnRequest {
                conversation_id: Some(conversation.clone()),
                message: None,
                checkpoint_id: Some(checkpoint_id.clone()),
                enable_checkpointing: None,
            }),
            Command::Config => None,
        }
    }

    /// The conversation the user picked explicitly, if any.
    ///
    /// History lives in memory for one process, so a named conversation
    /// always starts empty.
    pub fn named_conversation(&self) -> Option<&str> {
        match self {
            Command::Run { conversation, .. } if conversation != DEFAULT_CONVERSATION => {
                Some(conversation)
            }
            Command::Resume { conversation, .. } => Some(conversation),
            _ => None,
        }
    }
}
