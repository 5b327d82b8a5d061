#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};

use crate::config::{self, Configuration, load_configuration, lookup_config_path};

#[derive(Debug, Parser)]
#[command(
    version,
    about,
    long_about = r#"Chat with local reasoning models, keeping their thoughts apart from the answer

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/thinkchat/config.toml
    * $HOME/.config/thinkchat/config.toml
    * $HOME/.thinkchat.toml
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Show the version
    #[arg(short, long)]
    version: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Action {
    /// Start an interactive session (default)
    Chat {
        /// Continue an existing thread
        #[arg(short, long, value_name = "ID")]
        thread: Option<String>,

        /// Title of the thread created by the first prompt
        #[arg(long)]
        title: Option<String>,

        /// Model to use instead of backend.default_model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Send a single prompt and print the answer
    Ask {
        /// The prompt; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Append to an existing thread instead of creating one
        #[arg(short, long, value_name = "ID")]
        thread: Option<String>,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// List threads, most recently updated first
    Threads {
        /// Only threads whose title contains TEXT
        #[arg(long, value_name = "TEXT")]
        title: Option<String>,

        /// Only threads with a message containing TEXT
        #[arg(long, value_name = "TEXT")]
        contains: Option<String>,

        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Create an empty thread and print its id
    New { title: String },

    /// Print every message of a thread
    Show { thread_id: String },

    /// Change the title of a thread
    Rename { thread_id: String, title: String },

    /// Delete a thread and its messages
    Delete { thread_id: String },

    /// List the models offered by the configured connections
    Models,
}

impl Action {
    /// Whether the command talks to a model server.
    pub fn needs_backend(&self) -> bool {
        matches!(
            self,
            Action::Chat { .. } | Action::Ask { .. } | Action::Models
        )
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::Chat {
            thread: None,
            title: None,
            model: None,
        }
    }
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        if config_path.is_empty() {
            // No config path is specified just use the default config
            return Ok(Configuration::default());
        }
        load_configuration(config_path.as_str()).wrap_err("loading configuration")
    }

    pub fn action(&self) -> Action {
        self.action.clone().unwrap_or_default()
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }
}
