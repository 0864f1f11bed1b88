pub mod archive;
pub mod compile_pipeline;
pub mod engine;
pub mod gather_pipeline;
pub mod watcher;

pub use crate::domain::model::{ArchiveEntry, BuildArtifact};
pub use crate::domain::ports::{CompileSettings, ConfigProvider, GatherSettings, Pipeline, Storage};
pub use crate::utils::error::Result;
