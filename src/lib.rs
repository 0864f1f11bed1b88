pub mod config;
pub mod core;
pub mod domain;
pub mod tutorial;
pub mod utils;

pub use config::{storage::LocalStorage, CompileConfig, GatherConfig, WatchConfig};
pub use crate::core::{
    compile_pipeline::TutorialPipeline, engine::BuildEngine, gather_pipeline::CollectionPipeline,
};
pub use utils::error::{BuildError, Result};
