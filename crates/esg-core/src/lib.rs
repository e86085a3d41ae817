pub mod config;
pub mod error;
pub mod knowledge;
pub mod types;

pub use config::EsgConfig;
pub use error::{EsgError, Result};
pub use knowledge::{KeywordMode, KeywordRule, KnowledgeBase, ResponseTable};
pub use types::*;
