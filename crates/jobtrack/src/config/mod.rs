pub mod loader;
pub mod schema;

pub use loader::{
    default_database_path, load_config, load_config_from_str, load_or_create_config, write_config,
};
pub use schema::{AiConfig, Config, IdentityConfig, KeywordsConfig};
