mod assets;
pub mod completion;
pub mod config;
pub mod generation;
pub mod model;
pub mod provider;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use crate::assets::get_data_dir;
pub use crate::completion::dispatch;
pub use crate::provider::llm::get_completion_llm;
