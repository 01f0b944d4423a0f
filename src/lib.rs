pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};

pub use crate::core::{
    api::ApiClient,
    cache::DataCache,
    engine::DeskEngine,
    layout::{DashboardLayout, DragSession, LayoutStore},
    search::{SearchOptions, SearchService},
};
pub use crate::domain::model::{EntityKind, Record};
pub use crate::utils::error::{DeskError, Result};
