pub mod api;
pub mod cache;
pub mod engine;
pub mod interview;
pub mod layout;
pub mod listing;
pub mod search;
pub mod session;

pub use crate::domain::model::{EntityKind, Record};
pub use crate::domain::ports::{ConfigProvider, ResourceSource, Storage};
pub use crate::utils::error::Result;
