//! Unified configuration layer.
//!
//! Every environment variable is read here; the rest of the workspace works
//! with typed config structs instead of calling `std::env::var` directly.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `env_usize` and `.env` loading
//! - `schema`: `LlmConfig`, `GraphConfig`, `SeriesConfig`, `PlannerSettings`, `ObservabilityConfig`
//! - `env_keys`: key constants plus the legacy aliases accepted for each

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_usize, load_dotenv, load_dotenv_from};
pub use schema::{GraphConfig, LlmConfig, ObservabilityConfig, PlannerSettings, SeriesConfig};
