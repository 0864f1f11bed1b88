use crate::domain::model::BuildArtifact;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn repository_path(&self) -> &Path;
    fn output_path(&self) -> &str;
}

pub trait CompileSettings: ConfigProvider {
    fn tip_revision(&self) -> &str;
}

pub trait GatherSettings: ConfigProvider {
    fn index_file(&self) -> &str;
    fn make_release(&self) -> bool;
    fn releases_branch(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// What the extract phase reads out of the repository.
    type Source: Send;

    async fn extract(&self) -> Result<Self::Source>;
    async fn transform(&self, source: Self::Source) -> Result<BuildArtifact>;
    async fn load(&self, artifact: BuildArtifact) -> Result<String>;
}
