//! Local services: chat persistence, offline model packs and the prompt
//! template library.

pub mod chat_store;
pub mod model_manager;
pub mod prompt_library;

pub use chat_store::{ChatStore, SearchResult};
pub use model_manager::{ModelManager, ModelStatus};
pub use prompt_library::{PromptCategory, PromptTemplate};
