use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::DEFAULT_PROMPTS;

#[derive(Clone, Parser)]
#[command(
    name = "sqlagent",
    version,
    about = "Ask questions about a SQLite database with a tool-calling model"
)]
pub struct Config {
    /// SQLite connection URL.
    #[arg(long, env = "SQLAGENT_DATABASE", default_value = "sqlite:db.sqlite")]
    pub database: String,

    /// Directory the write_report tool writes into.
    #[arg(long, env = "SQLAGENT_REPORT_DIR", default_value = ".")]
    pub report_dir: PathBuf,

    #[arg(long, env = "SQLAGENT_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    pub base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Tool iterations allowed per turn before giving up.
    #[arg(long, default_value_t = 15)]
    pub max_iterations: u32,

    /// Model attempts per request; transient failures are retried.
    #[arg(long, default_value_t = 3)]
    pub model_attempts: usize,

    /// Per-request model timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub model_timeout_secs: u64,

    /// Per-call tool timeout in seconds. Unset lets tools run to completion.
    #[arg(long)]
    pub tool_timeout_secs: Option<u64>,

    /// Conversation history session id.
    #[arg(long, default_value = "default")]
    pub session: String,

    /// Do not print outgoing messages.
    #[arg(long)]
    pub quiet: bool,

    /// Prompts to run in order within the session.
    pub prompts: Vec<String>,
}

impl Config {
    pub fn prompts(&self) -> Vec<String> {
        if self.prompts.is_empty() {
            DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
        } else {
            self.prompts.clone()
        }
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database", &self.database)
            .field("report_dir", &self.report_dir)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("max_iterations", &self.max_iterations)
            .field("model_attempts", &self.model_attempts)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("session", &self.session)
            .field("quiet", &self.quiet)
            .finish()
    }
}
