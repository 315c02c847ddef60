use clap::{Parser, Subcommand, ValueEnum};

/// dormtwin - ask questions about the dormitory digital twin
#[derive(Parser, Debug)]
#[command(name = "dormtwin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared LLM overrides. Unset flags fall back to the environment.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LlmArgs {
    /// OpenAI-compatible API base URL
    #[arg(long, env = "DORMTWIN_API_BASE")]
    pub api_base: Option<String>,

    /// API key
    #[arg(long, env = "DORMTWIN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name (e.g. gpt-4o, gemini-2.0-flash, claude-3-5-sonnet-latest)
    #[arg(long, short, env = "DORMTWIN_MODEL")]
    pub model: Option<String>,

    /// Maximum model round-trips per question (default: from env or 10)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Per-question deadline in seconds (default: from env, none)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question, e.g. "Which AC unit services room 103?"
        #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
        question: Vec<String>,

        #[command(flatten)]
        llm: LlmArgs,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Show each executed query and its rows
        #[arg(long, short)]
        verbose: bool,
    },

    /// Interactive REPL; every line is an independent question
    Chat {
        #[command(flatten)]
        llm: LlmArgs,

        /// Show each executed query and its rows
        #[arg(long, short)]
        verbose: bool,
    },

    /// Check whether a query would be allowed, without running it
    Validate {
        /// Query dialect
        #[arg(long, short, value_enum)]
        dialect: DialectArg,

        /// Query text
        #[arg(value_name = "QUERY", required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Ping the graph and time-series backends
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectArg {
    /// Cypher, for the building graph
    Graph,
    /// SQL, for the sensor time series
    Series,
}

impl From<DialectArg> for dormtwin_agent::Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Graph => dormtwin_agent::Dialect::Graph,
            DialectArg::Series => dormtwin_agent::Dialect::Tabular,
        }
    }
}
