use crate::core::archive::write_zip;
use crate::core::{BuildArtifact, CompileSettings, Pipeline, Storage};
use crate::tutorial::{ProjectHistory, TutorialBundle};
use crate::utils::error::Result;

/// Compiles a single tutorial from its history into a zipfile.
pub struct TutorialPipeline<S: Storage, C: CompileSettings> {
    storage: S,
    config: C,
}

impl<S: Storage, C: CompileSettings> TutorialPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: CompileSettings> Pipeline for TutorialPipeline<S, C> {
    type Source = ProjectHistory;

    async fn extract(&self) -> Result<ProjectHistory> {
        tracing::debug!(
            "Opening {} at {}",
            self.config.repository_path().display(),
            self.config.tip_revision()
        );
        let history =
            ProjectHistory::open(self.config.repository_path(), self.config.tip_revision())?;

        for commit in history.project_commits() {
            tracing::debug!("{} ({} deltas)", commit, commit.deltas().len());
        }

        Ok(history)
    }

    async fn transform(&self, history: ProjectHistory) -> Result<BuildArtifact> {
        let bundle = TutorialBundle::from_project_history(&history)?;
        tracing::info!(
            "Compiled tutorial '{}' at {}",
            bundle.top_level_directory_name,
            bundle.tip_oid
        );
        Ok(BuildArtifact::new(bundle.archive_entries()))
    }

    async fn load(&self, artifact: BuildArtifact) -> Result<String> {
        let output_path = self.config.output_path().to_string();

        let zip_data = write_zip(&artifact.entries)?;
        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&output_path, &zip_data).await?;

        Ok(output_path)
    }
}
