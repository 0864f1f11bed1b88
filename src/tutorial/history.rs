//! Representation of a tutorial within a Git repository.
//!
//! The files making up a tutorial all live within one top-level directory
//! named for the tutorial. Using `bunner` as the example:
//!
//! ```text
//! bunner/
//!    tutorial.md
//!    summary.md          (optional)
//!    code.py
//!    project-assets/
//!       images/rabbit.png
//!       sounds/squish.mp3
//! ```
//!
//! The relevant stretch of history is a [`ProjectHistory`], made of
//! [`ProjectCommit`]s, each of which should be one of a handful of forms:
//!
//! * the unique *base* commit, whose subject starts `{base}`;
//! * a change to `code.py`, normally tagged with a `{#slug}` subject prefix;
//! * a change to `tutorial.md`;
//! * the addition of one or more files under `project-assets/`.

use crate::tutorial::patch::CodePatch;
use crate::utils::error::{BuildError, Result};
use git2::{Delta, DiffDelta, Oid, Repository};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

pub const PROJECT_ASSET_DIRNAME: &str = "project-assets";
pub const CODE_FILE_BASENAME: &str = "code.py";
pub const TUTORIAL_TEXT_FILE_BASENAME: &str = "tutorial.md";
pub const SUMMARY_TEXT_FILE_BASENAME: &str = "summary.md";

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{#([^ ]+)\}").expect("valid slug regex"))
}

fn base_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{base\}").expect("valid base regex"))
}

/// An asset (graphics or sound) used in the tutorial's project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAsset {
    pub path: String,
    pub data: Vec<u8>,
}

impl ProjectAsset {
    pub fn from_delta(repo: &Repository, delta: &CommitDelta) -> Result<Self> {
        if delta.status != Delta::Added {
            return Err(BuildError::MalformedHistory {
                message: format!("delta for {:?} is not of type ADDED", delta.path()),
            });
        }

        let path = delta.new_path.clone().unwrap_or_default();
        let data = repo.find_blob(delta.new_id)?.content().to_vec();
        Ok(Self { path, data })
    }
}

impl fmt::Display for ProjectAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ProjectAsset \"{}\": {} bytes>", self.path, self.data.len())
    }
}

/// One file-level change between a commit and its first parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDelta {
    pub status: Delta,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub old_id: Oid,
    pub new_id: Oid,
}

impl CommitDelta {
    fn from_diff_delta(delta: DiffDelta<'_>) -> Self {
        let as_string = |bytes: Option<&[u8]>| bytes.map(|b| String::from_utf8_lossy(b).into_owned());
        Self {
            status: delta.status(),
            old_path: as_string(delta.old_file().path_bytes()),
            new_path: as_string(delta.new_file().path_bytes()),
            old_id: delta.old_file().id(),
            new_id: delta.new_file().id(),
        }
    }

    /// The path this delta concerns, preferring the new side.
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }
}

/// An individual commit within a tutorial's history.
#[derive(Debug, Clone)]
pub struct ProjectCommit {
    oid: Oid,
    message_subject: String,
    tree_id: Oid,
    parent_ids: Vec<Oid>,
    deltas: Vec<CommitDelta>,
}

impl ProjectCommit {
    pub fn from_repo(repo: &Repository, oid: Oid) -> Result<Self> {
        let commit = repo.find_commit(oid)?;
        let message = String::from_utf8_lossy(commit.message_bytes());
        let message_subject = message.split('\n').next().unwrap_or_default().to_string();

        let tree = commit.tree()?;
        let parent_ids: Vec<Oid> = commit.parent_ids().collect();

        // A root commit is diffed against the empty tree.
        let parent_tree = match parent_ids.first() {
            Some(parent_id) => Some(repo.find_commit(*parent_id)?.tree()?),
            None => None,
        };
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let deltas = diff.deltas().map(CommitDelta::from_diff_delta).collect();

        Ok(Self {
            oid,
            message_subject,
            tree_id: tree.id(),
            parent_ids,
            deltas,
        })
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn parent_ids(&self) -> &[Oid] {
        &self.parent_ids
    }

    pub fn deltas(&self) -> &[CommitDelta] {
        &self.deltas
    }

    pub fn short_oid(&self) -> String {
        let mut hex = self.oid.to_string();
        hex.truncate(12);
        hex
    }

    pub fn maybe_identifier_slug(&self) -> Option<&str> {
        slug_regex()
            .captures(&self.message_subject)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn has_identifier_slug(&self) -> bool {
        self.maybe_identifier_slug().is_some()
    }

    pub fn identifier_slug(&self) -> Result<&str> {
        self.maybe_identifier_slug()
            .ok_or_else(|| BuildError::malformed_commit(self.oid, "has no identifier-slug"))
    }

    pub fn is_base(&self) -> bool {
        base_regex().is_match(&self.message_subject)
    }

    pub fn sole_modify_against_parent(&self) -> Result<&CommitDelta> {
        let [delta] = self.deltas.as_slice() else {
            return Err(BuildError::malformed_commit(
                self.oid,
                "does not have exactly one delta",
            ));
        };
        if delta.status != Delta::Modified {
            return Err(BuildError::malformed_commit(
                self.oid,
                "delta is not of type MODIFIED",
            ));
        }
        Ok(delta)
    }

    pub fn modifies_single_file(&self, target_basename: &str) -> bool {
        match self.sole_modify_against_parent() {
            Ok(delta) => delta
                .old_path
                .as_deref()
                .and_then(|p| p.rsplit('/').next())
                .is_some_and(|basename| basename == target_basename),
            Err(_) => false,
        }
    }

    pub fn modifies_tutorial_text(&self) -> bool {
        self.modifies_single_file(TUTORIAL_TEXT_FILE_BASENAME)
    }

    pub fn modifies_python_code(&self) -> bool {
        self.modifies_single_file(CODE_FILE_BASENAME)
    }

    pub fn path_is_a_project_asset(path: &str) -> bool {
        path.split('/').nth(1) == Some(PROJECT_ASSET_DIRNAME)
    }

    fn is_asset_addition(delta: &CommitDelta) -> bool {
        delta.status == Delta::Added
            && delta
                .new_path
                .as_deref()
                .is_some_and(Self::path_is_a_project_asset)
    }

    /// Whether this commit adds project assets, and nothing else.
    ///
    /// The base commit may add all sorts of files, so never counts.
    pub fn adds_project_assets(&self) -> Result<bool> {
        if self.is_base() {
            return Ok(false);
        }

        let (adding_assets, other): (Vec<&CommitDelta>, Vec<&CommitDelta>) =
            self.deltas.iter().partition(|d| Self::is_asset_addition(d));

        if !adding_assets.is_empty() && !other.is_empty() {
            return Err(BuildError::malformed_commit(
                self.oid,
                "adds project assets but also has other deltas",
            ));
        }

        Ok(!adding_assets.is_empty())
    }

    pub fn added_assets(&self, repo: &Repository) -> Result<Vec<ProjectAsset>> {
        if !self.adds_project_assets()? {
            return Ok(Vec::new());
        }
        self.deltas
            .iter()
            .map(|delta| ProjectAsset::from_delta(repo, delta))
            .collect()
    }

    pub fn code_patch_against_parent(&self, repo: &Repository) -> Result<CodePatch> {
        if !self.modifies_python_code() {
            return Err(BuildError::malformed_commit(
                self.oid,
                "does not modify the Python code",
            ));
        }

        let delta = self.sole_modify_against_parent()?;
        let old_blob = repo.find_blob(delta.old_id)?;
        let new_blob = repo.find_blob(delta.new_id)?;
        CodePatch::from_blobs(&old_blob, &new_blob)
    }

    pub fn summary_label(&self) -> Result<String> {
        if let Some(slug) = self.maybe_identifier_slug() {
            return Ok(format!("#{}", slug));
        }
        if self.modifies_python_code() {
            return Ok("untagged-Python-change".to_string());
        }
        if self.is_base() {
            return Ok("BASE".to_string());
        }
        if self.adds_project_assets()? {
            let asset_paths = self
                .deltas
                .iter()
                .map(|d| format!("\"{}\"", d.path()))
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(format!("assets({})", asset_paths));
        }
        if self.modifies_tutorial_text() {
            return Ok("tutorial-text".to_string());
        }
        Ok("?? unknown ??".to_string())
    }

    #[cfg(test)]
    pub(crate) fn synthetic(subject: &str, deltas: Vec<CommitDelta>) -> Self {
        Self {
            oid: Oid::zero(),
            message_subject: subject.to_string(),
            tree_id: Oid::zero(),
            parent_ids: Vec::new(),
            deltas,
        }
    }
}

impl fmt::Display for ProjectCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .summary_label()
            .unwrap_or_else(|e| format!("!! {} !!", e));
        write!(f, "<ProjectCommit: {} {}>", self.short_oid(), label)
    }
}

/// Development history of a Pytch project within a tutorial.
pub struct ProjectHistory {
    repo: Repository,
    tip_oid: Oid,
    project_commits: Vec<ProjectCommit>,
}

impl ProjectHistory {
    pub fn open<P: AsRef<Path>>(repo_directory: P, tip_revision: &str) -> Result<Self> {
        let repo = Repository::open(repo_directory.as_ref())?;
        let tip_oid = repo.revparse_single(tip_revision)?.peel_to_commit()?.id();
        let project_commits = Self::commit_linear_ancestors(&repo, tip_oid)?;

        tracing::debug!(
            "Loaded history of {} commits from {} ({})",
            project_commits.len(),
            tip_revision,
            tip_oid
        );

        Ok(Self {
            repo,
            tip_oid,
            project_commits,
        })
    }

    /// Commits from the tip back to the base commit, inclusive, tip first.
    fn commit_linear_ancestors(repo: &Repository, tip_oid: Oid) -> Result<Vec<ProjectCommit>> {
        let mut project_commits = Vec::new();
        let mut current = ProjectCommit::from_repo(repo, tip_oid)?;

        while !current.is_base() {
            let Some(&parent_id) = current.parent_ids.first() else {
                return Err(BuildError::MalformedHistory {
                    message: format!(
                        "reached root commit {} without finding a {{base}} commit",
                        current.oid
                    ),
                });
            };
            if current.parent_ids.len() > 1 {
                tracing::debug!("Following first parent of merge commit {}", current.short_oid());
            }
            project_commits.push(current);
            current = ProjectCommit::from_repo(repo, parent_id)?;
        }

        project_commits.push(current);
        Ok(project_commits)
    }

    pub fn tip_oid(&self) -> Oid {
        self.tip_oid
    }

    pub fn tip_oid_string(&self) -> String {
        self.tip_oid.to_string()
    }

    pub fn project_commits(&self) -> &[ProjectCommit] {
        &self.project_commits
    }

    fn tip_commit(&self) -> &ProjectCommit {
        &self.project_commits[0]
    }

    fn base_commit(&self) -> &ProjectCommit {
        &self.project_commits[self.project_commits.len() - 1]
    }

    /// All assets added during the history of the project.
    pub fn all_project_assets(&self) -> Result<Vec<ProjectAsset>> {
        let mut assets = Vec::new();
        for commit in &self.project_commits {
            assets.extend(commit.added_assets(&self.repo)?);
        }
        Ok(assets)
    }

    /// The sole directory at top level of the tip's tree; `bunner` in the example.
    pub fn top_level_directory_name(&self) -> Result<String> {
        let final_tree = self.repo.find_tree(self.tip_commit().tree_id)?;

        let n_entries = final_tree.len();
        if n_entries != 1 {
            return Err(BuildError::MalformedHistory {
                message: format!(
                    "top-level tree has {} entries (expecting just one)",
                    n_entries
                ),
            });
        }

        final_tree
            .iter()
            .next()
            .and_then(|entry| entry.name().map(str::to_string))
            .ok_or_else(|| BuildError::MalformedHistory {
                message: "top-level entry name is not valid UTF-8".to_string(),
            })
    }

    pub fn python_code_path(&self) -> Result<String> {
        Ok(format!("{}/{}", self.top_level_directory_name()?, CODE_FILE_BASENAME))
    }

    pub fn tutorial_text_path(&self) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.top_level_directory_name()?,
            TUTORIAL_TEXT_FILE_BASENAME
        ))
    }

    pub fn summary_text_path(&self) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.top_level_directory_name()?,
            SUMMARY_TEXT_FILE_BASENAME
        ))
    }

    fn maybe_file_bytes(&self, commit: &ProjectCommit, path: &str) -> Result<Option<Vec<u8>>> {
        let tree = self.repo.find_tree(commit.tree_id)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    fn file_text(&self, commit: &ProjectCommit, path: &str) -> Result<String> {
        let bytes = self
            .maybe_file_bytes(commit, path)?
            .ok_or_else(|| BuildError::MissingFile {
                path: path.to_string(),
                oid: commit.oid.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|_| BuildError::InvalidUtf8 {
            path: path.to_string(),
        })
    }

    /// Contents of `tutorial.md` as of the tip commit.
    pub fn tutorial_text(&self) -> Result<String> {
        self.file_text(self.tip_commit(), &self.tutorial_text_path()?)
    }

    /// Contents of `code.py` as of the base commit.
    pub fn initial_code_text(&self) -> Result<String> {
        self.file_text(self.base_commit(), &self.python_code_path()?)
    }

    /// Contents of `code.py` as of the tip commit.
    pub fn final_code_text(&self) -> Result<String> {
        self.file_text(self.tip_commit(), &self.python_code_path()?)
    }

    /// Contents of `summary.md` as of the tip commit, if the tutorial has one.
    pub fn summary_text(&self) -> Result<Option<String>> {
        let path = self.summary_text_path()?;
        match self.maybe_file_bytes(self.tip_commit(), &path)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| BuildError::InvalidUtf8 { path }),
            None => Ok(None),
        }
    }

    pub fn commit_from_slug(&self) -> Result<HashMap<&str, &ProjectCommit>> {
        let mut by_slug = HashMap::new();
        for commit in &self.project_commits {
            if let Some(slug) = commit.maybe_identifier_slug() {
                if by_slug.insert(slug, commit).is_some() {
                    return Err(BuildError::DuplicateSlug {
                        slug: slug.to_string(),
                    });
                }
            }
        }
        Ok(by_slug)
    }

    fn commit_for_slug(&self, slug: &str) -> Result<&ProjectCommit> {
        self.commit_from_slug()?
            .get(slug)
            .copied()
            .ok_or_else(|| BuildError::UnknownSlug {
                slug: slug.to_string(),
            })
    }

    /// Contents of `code.py` as of the commit tagged with `slug`.
    pub fn code_text_from_slug(&self, slug: &str) -> Result<String> {
        let commit = self.commit_for_slug(slug)?;
        self.file_text(commit, &self.python_code_path()?)
    }

    pub fn code_patch_against_parent(&self, slug: &str) -> Result<CodePatch> {
        self.commit_for_slug(slug)?
            .code_patch_against_parent(&self.repo)
    }
}

impl fmt::Debug for ProjectHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectHistory")
            .field("repo", &self.repo.path())
            .field("tip_oid", &self.tip_oid)
            .field("project_commits", &self.project_commits.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(status: Delta, path: &str) -> CommitDelta {
        let old_path = (status != Delta::Added).then(|| path.to_string());
        let new_path = (status != Delta::Deleted).then(|| path.to_string());
        CommitDelta {
            status,
            old_path,
            new_path,
            old_id: Oid::zero(),
            new_id: Oid::zero(),
        }
    }

    #[test]
    fn test_identifier_slug_parsing() {
        let commit = ProjectCommit::synthetic("{#check-for-winning} Add win check", vec![]);
        assert_eq!(commit.maybe_identifier_slug(), Some("check-for-winning"));
        assert_eq!(commit.identifier_slug().unwrap(), "check-for-winning");

        let commit = ProjectCommit::synthetic("{#no-space-after}Tidy", vec![]);
        assert_eq!(commit.maybe_identifier_slug(), Some("no-space-after"));

        let commit = ProjectCommit::synthetic("Add win check {#late}", vec![]);
        assert!(!commit.has_identifier_slug());
        assert!(commit.identifier_slug().is_err());

        let commit = ProjectCommit::synthetic("{#with space} oops", vec![]);
        assert!(!commit.has_identifier_slug());
    }

    #[test]
    fn test_base_detection() {
        assert!(ProjectCommit::synthetic("{base} Initial state", vec![]).is_base());
        assert!(!ProjectCommit::synthetic("Initial {base}", vec![]).is_base());
        assert!(!ProjectCommit::synthetic("{#base} tagged", vec![]).is_base());
    }

    #[test]
    fn test_path_is_a_project_asset() {
        assert!(ProjectCommit::path_is_a_project_asset(
            "bunner/project-assets/images/rabbit.png"
        ));
        assert!(!ProjectCommit::path_is_a_project_asset("bunner/code.py"));
        assert!(!ProjectCommit::path_is_a_project_asset("project-assets"));
        assert!(!ProjectCommit::path_is_a_project_asset(
            "project-assets/images/rabbit.png"
        ));
    }

    #[test]
    fn test_sole_modify_detection() {
        let code_change =
            ProjectCommit::synthetic("Tweak", vec![delta(Delta::Modified, "bunner/code.py")]);
        assert!(code_change.modifies_python_code());
        assert!(!code_change.modifies_tutorial_text());

        let two_changes = ProjectCommit::synthetic(
            "Tweak",
            vec![
                delta(Delta::Modified, "bunner/code.py"),
                delta(Delta::Modified, "bunner/tutorial.md"),
            ],
        );
        assert!(!two_changes.modifies_python_code());
        assert!(two_changes.sole_modify_against_parent().is_err());

        let added = ProjectCommit::synthetic("Add", vec![delta(Delta::Added, "bunner/code.py")]);
        assert!(!added.modifies_python_code());
    }

    #[test]
    fn test_adds_project_assets() {
        let assets = ProjectCommit::synthetic(
            "Add graphics",
            vec![
                delta(Delta::Added, "bunner/project-assets/images/rabbit.png"),
                delta(Delta::Added, "bunner/project-assets/images/car.png"),
            ],
        );
        assert!(assets.adds_project_assets().unwrap());

        let mixed = ProjectCommit::synthetic(
            "Add graphics and code",
            vec![
                delta(Delta::Added, "bunner/project-assets/images/rabbit.png"),
                delta(Delta::Modified, "bunner/code.py"),
            ],
        );
        assert!(mixed.adds_project_assets().is_err());

        let base = ProjectCommit::synthetic(
            "{base} Start",
            vec![
                delta(Delta::Added, "bunner/project-assets/images/rabbit.png"),
                delta(Delta::Added, "bunner/code.py"),
            ],
        );
        assert!(!base.adds_project_assets().unwrap());
    }

    #[test]
    fn test_summary_label_priority() {
        let tagged = ProjectCommit::synthetic(
            "{#add-rabbit} Add rabbit",
            vec![delta(Delta::Modified, "bunner/code.py")],
        );
        assert_eq!(tagged.summary_label().unwrap(), "#add-rabbit");

        let untagged =
            ProjectCommit::synthetic("Fix typo", vec![delta(Delta::Modified, "bunner/code.py")]);
        assert_eq!(untagged.summary_label().unwrap(), "untagged-Python-change");

        let base = ProjectCommit::synthetic("{base} Start", vec![]);
        assert_eq!(base.summary_label().unwrap(), "BASE");

        let assets = ProjectCommit::synthetic(
            "Graphics",
            vec![delta(Delta::Added, "bunner/project-assets/a.png")],
        );
        assert_eq!(
            assets.summary_label().unwrap(),
            "assets(\"bunner/project-assets/a.png\")"
        );

        let text = ProjectCommit::synthetic(
            "Words",
            vec![delta(Delta::Modified, "bunner/tutorial.md")],
        );
        assert_eq!(text.summary_label().unwrap(), "tutorial-text");

        let unknown =
            ProjectCommit::synthetic("Odd", vec![delta(Delta::Deleted, "bunner/notes.txt")]);
        assert_eq!(unknown.summary_label().unwrap(), "?? unknown ??");
    }

    #[test]
    fn test_display_forms() {
        let commit = ProjectCommit::synthetic("{base} Start", vec![]);
        assert_eq!(commit.to_string(), "<ProjectCommit: 000000000000 BASE>");

        let asset = ProjectAsset {
            path: "bunner/project-assets/rabbit.png".to_string(),
            data: vec![0; 42],
        };
        assert_eq!(
            asset.to_string(),
            "<ProjectAsset \"bunner/project-assets/rabbit.png\": 42 bytes>"
        );
    }
}
