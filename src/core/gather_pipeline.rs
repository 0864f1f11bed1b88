use crate::core::archive::write_zip;
use crate::core::{BuildArtifact, GatherSettings, Pipeline, Storage};
use crate::tutorial::release::commit_to_releases;
use crate::tutorial::TutorialCollection;
use crate::utils::error::Result;
use git2::Repository;

/// Gathers every tutorial in the index into one zipfile, optionally
/// recording a release commit first.
pub struct CollectionPipeline<S: Storage, C: GatherSettings> {
    storage: S,
    config: C,
}

impl<S: Storage, C: GatherSettings> CollectionPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: GatherSettings> Pipeline for CollectionPipeline<S, C> {
    type Source = TutorialCollection;

    async fn extract(&self) -> Result<TutorialCollection> {
        let collection =
            TutorialCollection::from_repo_path(self.config.repository_path(), self.config.index_file())?;
        tracing::info!("Found {} tutorials in the index", collection.len());
        Ok(collection)
    }

    async fn transform(&self, collection: TutorialCollection) -> Result<BuildArtifact> {
        let release_oid = if self.config.make_release() {
            let repo = Repository::open(self.config.repository_path())?;
            Some(commit_to_releases(
                &repo,
                &collection.gathered_tip_oids(),
                self.config.releases_branch(),
            )?)
        } else {
            None
        };

        Ok(BuildArtifact::new(collection.archive_entries(release_oid)?))
    }

    async fn load(&self, artifact: BuildArtifact) -> Result<String> {
        let output_path = self.config.output_path().to_string();

        let zip_data = write_zip(&artifact.entries)?;
        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&output_path, &zip_data).await?;

        Ok(output_path)
    }
}
