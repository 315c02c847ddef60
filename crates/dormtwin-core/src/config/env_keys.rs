//! Environment variable keys and their aliases.
//!
//! Primary keys use the `DORMTWIN_*` prefix. The plain names used by the
//! legacy deployment scripts (`NEO4J_URI`, `INFLUXDB_TOKEN`, `OPENAI_API_KEY`, ...)
//! are accepted as aliases.

/// Completion API
pub mod llm {
    pub const API_BASE: &str = "DORMTWIN_API_BASE";
    pub const API_BASE_ALIASES: &[&str] = &["OPENAI_API_BASE", "OPENAI_BASE_URL", "BASE_URL"];

    pub const API_KEY: &str = "DORMTWIN_API_KEY";
    pub const API_KEY_ALIASES: &[&str] = &["OPENAI_API_KEY", "GEMINI_API_KEY", "API_KEY"];

    pub const MODEL: &str = "DORMTWIN_MODEL";
    pub const MODEL_ALIASES: &[&str] = &["OPENAI_MODEL", "MODEL"];

    pub const TEMPERATURE: &str = "DORMTWIN_TEMPERATURE";

    /// Max output tokens per completion.
    pub const MAX_TOKENS: &str = "DORMTWIN_MAX_TOKENS";
}

/// Graph store (Neo4j HTTP API)
pub mod graph {
    pub const URL: &str = "DORMTWIN_NEO4J_URL";
    pub const URL_ALIASES: &[&str] = &["NEO4J_HTTP_URL", "NEO4J_URI"];

    pub const USER: &str = "DORMTWIN_NEO4J_USER";
    pub const USER_ALIASES: &[&str] = &["NEO4J_USER", "NEO4J_USERNAME"];

    pub const PASSWORD: &str = "DORMTWIN_NEO4J_PASSWORD";
    pub const PASSWORD_ALIASES: &[&str] = &["NEO4J_PASSWORD"];

    pub const DATABASE: &str = "DORMTWIN_NEO4J_DATABASE";
    pub const DATABASE_ALIASES: &[&str] = &["NEO4J_DATABASE"];
}

/// Time-series store (InfluxDB 3 SQL API)
pub mod series {
    pub const URL: &str = "DORMTWIN_INFLUX_URL";
    pub const URL_ALIASES: &[&str] = &["INFLUXDB_URL"];

    /// Host and port are only used when no full URL is configured.
    pub const HOST: &str = "INFLUXDB_HOST";
    pub const PORT: &str = "INFLUXDB_PORT";

    pub const TOKEN: &str = "DORMTWIN_INFLUX_TOKEN";
    pub const TOKEN_ALIASES: &[&str] = &["INFLUXDB_TOKEN"];

    pub const DATABASE: &str = "DORMTWIN_INFLUX_DATABASE";
    pub const DATABASE_ALIASES: &[&str] = &["INFLUXDB_DATABASE"];
}

/// Backend request timeout, shared by both stores.
pub const BACKEND_TIMEOUT_SECS: &str = "DORMTWIN_BACKEND_TIMEOUT_SECS";

/// Planner loop limits
pub mod planner {
    pub const MAX_ITERATIONS: &str = "DORMTWIN_MAX_ITERATIONS";
    pub const MAX_RESULT_ROWS: &str = "DORMTWIN_MAX_RESULT_ROWS";
    pub const QUESTION_TIMEOUT_SECS: &str = "DORMTWIN_QUESTION_TIMEOUT_SECS";
    pub const MAX_NUDGES: &str = "DORMTWIN_MAX_NUDGES";
    pub const REPEAT_WARNING_THRESHOLD: &str = "DORMTWIN_REPEAT_WARNING_THRESHOLD";
}

/// Logging and trace output
pub mod observability {
    pub const QUIET: &str = "DORMTWIN_QUIET";
    pub const LOG_LEVEL: &str = "DORMTWIN_LOG_LEVEL";
    pub const LOG_JSON: &str = "DORMTWIN_LOG_JSON";

    /// JSONL file receiving planner trace events.
    pub const TRACE_LOG: &str = "DORMTWIN_TRACE_LOG";
}
