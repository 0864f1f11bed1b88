use crate::domain::model::ArchiveEntry;
use crate::tutorial::bundle::TutorialBundle;
use crate::tutorial::history::ProjectHistory;
use crate::utils::error::{BuildError, Result};
use git2::{Oid, Repository};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const TUTORIAL_INDEX_FILENAME: &str = "tutorial-index.html";

/// One tutorial listed in `index.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(rename = "tip-commit")]
    pub tip_commit: String,
}

pub fn parse_index(yaml: &str) -> Result<Vec<IndexEntry>> {
    let entries: Vec<IndexEntry> = serde_yaml::from_str(yaml)?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.name.as_str()) {
            return Err(BuildError::DuplicateTutorial {
                name: entry.name.clone(),
            });
        }
    }

    Ok(entries)
}

#[derive(Debug)]
pub struct CollectedTutorial {
    pub name: String,
    pub history: ProjectHistory,
}

/// The tutorials listed in the index, in index order.
#[derive(Debug)]
pub struct TutorialCollection {
    pub tutorials: Vec<CollectedTutorial>,
}

impl TutorialCollection {
    pub fn from_repo_path<P: AsRef<Path>>(repo_path: P, index_file: &str) -> Result<Self> {
        let repo_path = repo_path.as_ref();
        let index_path = {
            let repo = Repository::open(repo_path)?;
            let workdir = repo.workdir().ok_or_else(|| BuildError::BareRepository {
                path: repo_path.display().to_string(),
            })?;
            workdir.join(index_file)
        };

        tracing::info!("Reading tutorial index {}", index_path.display());
        let index_text =
            std::fs::read_to_string(&index_path).map_err(|e| BuildError::IndexNotFound {
                path: index_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let entries = parse_index(&index_text)?;

        let tutorials = entries
            .into_iter()
            .map(|entry| {
                tracing::debug!("Loading tutorial '{}' from {}", entry.name, entry.tip_commit);
                let history = ProjectHistory::open(repo_path, &entry.tip_commit)?;
                Ok(CollectedTutorial {
                    name: entry.name,
                    history,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { tutorials })
    }

    pub fn len(&self) -> usize {
        self.tutorials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tutorials.is_empty()
    }

    pub fn gathered_tip_oids(&self) -> Vec<Oid> {
        self.tutorials.iter().map(|t| t.history.tip_oid()).collect()
    }

    /// Every tutorial's bundle, then the index of their summaries.
    pub fn archive_entries(&self, release_oid: Option<Oid>) -> Result<Vec<ArchiveEntry>> {
        let bundles = self
            .tutorials
            .iter()
            .map(|t| TutorialBundle::from_project_history(&t.history))
            .collect::<Result<Vec<_>>>()?;

        let mut entries: Vec<ArchiveEntry> =
            bundles.iter().flat_map(|b| b.archive_entries()).collect();

        entries.push(ArchiveEntry::new(
            TUTORIAL_INDEX_FILENAME,
            tutorial_index_html(&bundles, release_oid),
        ));

        Ok(entries)
    }
}

pub fn tutorial_index_html(bundles: &[TutorialBundle], release_oid: Option<Oid>) -> String {
    let release_attr = release_oid
        .map(|oid| format!(" data-release-commit=\"{}\"", oid))
        .unwrap_or_default();

    let mut html = format!("<div class=\"tutorial-index\"{}>\n", release_attr);
    for bundle in bundles {
        html.push_str(&bundle.summary_div(Some(&bundle.top_level_directory_name)));
    }
    html.push_str("</div>\n");
    html
}
