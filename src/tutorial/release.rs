//! Recording which tutorial tips went into a gathered collection.
//!
//! A release commit's tree combines the sole top-level entry of each
//! contributing commit: first the recipe branch (`HEAD`), which holds just
//! `index.yaml`, then each tutorial tip, which holds just its directory.

use crate::utils::error::{BuildError, Result};
use chrono::Utc;
use git2::{Commit, FileMode, Oid, Repository, Signature, Time};

pub const DEFAULT_RELEASES_BRANCH: &str = "releases";

/// The single top-level entry a contributing commit provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributedEntry {
    pub commit_oid: Oid,
    pub name: String,
    pub id: Oid,
    pub filemode: i32,
}

pub fn create_signature(repo: &Repository) -> Result<Signature<'static>> {
    let config = repo.config()?;
    let lookup = |key: &str| {
        config
            .get_string(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| BuildError::Release {
                message: format!("repository configuration has no '{}'", key),
            })
    };
    let name = lookup("user.name")?;
    let email = lookup("user.email")?;

    let time = Time::new(Utc::now().timestamp(), 0);
    Ok(Signature::new(&name, &email, &time)?)
}

pub fn sole_tree_entry(repo: &Repository, commit_oid: Oid) -> Result<ContributedEntry> {
    let tree = repo.find_commit(commit_oid)?.tree()?;
    if tree.len() != 1 {
        return Err(BuildError::Release {
            message: format!("expecting just one entry in tree for {}", commit_oid),
        });
    }

    let entry = tree.get(0).ok_or_else(|| BuildError::Release {
        message: format!("cannot read tree entry for {}", commit_oid),
    })?;
    let name = entry.name().ok_or_else(|| BuildError::Release {
        message: format!("tree entry name for {} is not valid UTF-8", commit_oid),
    })?;

    Ok(ContributedEntry {
        commit_oid,
        name: name.to_string(),
        id: entry.id(),
        filemode: entry.filemode(),
    })
}

/// Entry 0 comes from the recipe branch and must be a blob; the rest come
/// from tutorial branches and must be trees.
pub fn verify_entry_type(idx: usize, entry: &ContributedEntry) -> Result<()> {
    if idx == 0 && entry.filemode != i32::from(FileMode::Blob) {
        return Err(BuildError::Release {
            message: format!("expecting tree-entry to be BLOB for {}", entry.id),
        });
    }
    if idx > 0 && entry.filemode != i32::from(FileMode::Tree) {
        return Err(BuildError::Release {
            message: format!("expecting tree-entry to be TREE for {}", entry.id),
        });
    }
    Ok(())
}

fn release_message(entries: &[ContributedEntry]) -> String {
    let mut message = format!(
        "Release {} tutorials at {}\n\n",
        entries.len().saturating_sub(1),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    for entry in entries {
        let mut short = entry.commit_oid.to_string();
        short.truncate(12);
        message.push_str(&format!("{} {}\n", short, entry.name));
    }
    message
}

/// Make a commit on `releases_branch` combining the recipe branch and the
/// given tutorial tips. Returns the new commit's oid.
pub fn commit_to_releases(
    repo: &Repository,
    tutorial_tip_oids: &[Oid],
    releases_branch: &str,
) -> Result<Oid> {
    let recipe_oid = repo.head()?.peel_to_commit()?.id();
    let contributing: Vec<Oid> = std::iter::once(recipe_oid)
        .chain(tutorial_tip_oids.iter().copied())
        .collect();

    let mut entries = Vec::with_capacity(contributing.len());
    let mut builder = repo.treebuilder(None)?;
    for (idx, oid) in contributing.iter().enumerate() {
        let entry = sole_tree_entry(repo, *oid)?;
        verify_entry_type(idx, &entry)?;
        if builder.get(entry.name.as_str())?.is_some() {
            return Err(BuildError::Release {
                message: format!("more than one contributing commit provides '{}'", entry.name),
            });
        }
        builder.insert(entry.name.as_str(), entry.id, entry.filemode)?;
        entries.push(entry);
    }
    let tree = repo.find_tree(builder.write()?)?;

    let branch_ref = format!("refs/heads/{}", releases_branch);
    let previous_release = match repo.find_reference(&branch_ref) {
        Ok(reference) => Some(reference.peel_to_commit()?),
        Err(e) if e.code() == git2::ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let mut parents: Vec<Commit<'_>> = previous_release.into_iter().collect();
    for oid in &contributing {
        parents.push(repo.find_commit(*oid)?);
    }
    let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

    let signature = create_signature(repo)?;
    let release_oid = repo.commit(
        None,
        &signature,
        &signature,
        &release_message(&entries),
        &tree,
        &parent_refs,
    )?;
    repo.reference(
        &branch_ref,
        release_oid,
        true,
        &format!("pytchbuild: release {}", release_oid),
    )?;

    tracing::info!(
        "Committed release {} to {} ({} parents)",
        release_oid,
        branch_ref,
        parent_refs.len()
    );
    Ok(release_oid)
}
