use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct BuildEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> BuildEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();

        tracing::debug!("Reading tutorial history...");
        let source = self.pipeline.extract().await?;

        tracing::debug!("Rendering tutorial content...");
        let artifact = self.pipeline.transform(source).await?;
        tracing::info!(
            "Rendered {} files ({} bytes)",
            artifact.entries.len(),
            artifact.total_bytes()
        );

        let output_path = self.pipeline.load(artifact).await?;
        tracing::info!("Output saved to: {} in {:?}", output_path, started.elapsed());

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ArchiveEntry, BuildArtifact};
    use crate::utils::error::BuildError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        phases: AtomicUsize,
        fail_transform: bool,
    }

    #[async_trait]
    impl Pipeline for CountingPipeline {
        type Source = Vec<String>;

        async fn extract(&self) -> Result<Vec<String>> {
            self.phases.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["bunner".to_string(), "boing".to_string()])
        }

        async fn transform(&self, source: Vec<String>) -> Result<BuildArtifact> {
            self.phases.fetch_add(1, Ordering::SeqCst);
            if self.fail_transform {
                return Err(BuildError::UnknownSlug {
                    slug: "missing".to_string(),
                });
            }
            Ok(BuildArtifact::new(
                source
                    .into_iter()
                    .map(|name| ArchiveEntry::new(format!("{}/code/code.py", name), "pass\n"))
                    .collect(),
            ))
        }

        async fn load(&self, artifact: BuildArtifact) -> Result<String> {
            self.phases.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} entries", artifact.entries.len()))
        }
    }

    #[tokio::test]
    async fn test_run_drives_all_phases() {
        let engine = BuildEngine::new(CountingPipeline {
            phases: AtomicUsize::new(0),
            fail_transform: false,
        });

        assert_eq!(engine.run().await.unwrap(), "2 entries");
        assert_eq!(engine.pipeline().phases.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_at_failing_phase() {
        let engine = BuildEngine::new(CountingPipeline {
            phases: AtomicUsize::new(0),
            fail_transform: true,
        });

        assert!(matches!(
            engine.run().await,
            Err(BuildError::UnknownSlug { .. })
        ));
        assert_eq!(engine.pipeline().phases.load(Ordering::SeqCst), 2);
    }
}
