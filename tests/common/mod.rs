#![allow(dead_code)]

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature, TreeWalkMode, TreeWalkResult};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

pub const RECIPES_BRANCH: &str = "main";

pub const BASE_CODE: &str = "import pytch


class Stage(pytch.Stage):
    pass
";

pub const RABBIT_CODE: &str = "import pytch


class Stage(pytch.Stage):
    pass


class Rabbit(pytch.Sprite):
    Costumes = [\"rabbit.png\"]
";

pub const HOPPING_RABBIT_CODE: &str = "import pytch


class Stage(pytch.Stage):
    pass


class Rabbit(pytch.Sprite):
    Costumes = [\"rabbit.png\"]

    @pytch.when_key_pressed(\"ArrowUp\")
    def hop(self):
        self.change_y(10)
";

pub const FINAL_TUTORIAL_TEXT: &str = "# Bunner

Help the rabbit cross the road.

---

## Adding the rabbit

{{< commit add-rabbit >}}

---

## Making it hop

{{< commit rabbit-moves >}}

{{< run-finished-project >}}
";

pub const SUMMARY_TEXT: &str = "Guide a *rabbit* across a busy road.\n";

pub const RABBIT_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// A scratch repository whose commits are built directly from trees.
pub struct TutorialRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TutorialRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(RECIPES_BRANCH);
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();

        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Release Bot").unwrap();
            config.set_str("user.email", "releases@example.com").unwrap();
        }

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn tree_files(&self, commit: &Commit<'_>) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        let tree = commit.tree().unwrap();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if let Ok(blob) = self.repo.find_blob(entry.id()) {
                files.insert(
                    format!("{}{}", root, entry.name().unwrap()),
                    blob.content().to_vec(),
                );
            }
            TreeWalkResult::Ok
        })
        .unwrap();
        files
    }

    fn write_tree(&self, files: &BTreeMap<String, Vec<u8>>) -> Oid {
        let mut builder = self.repo.treebuilder(None).unwrap();
        let mut subdirs: BTreeMap<String, BTreeMap<String, Vec<u8>>> = BTreeMap::new();

        for (path, data) in files {
            match path.split_once('/') {
                Some((dir, rest)) => {
                    subdirs
                        .entry(dir.to_string())
                        .or_default()
                        .insert(rest.to_string(), data.clone());
                }
                None => {
                    let blob = self.repo.blob(data).unwrap();
                    builder.insert(path.as_str(), blob, 0o100644).unwrap();
                }
            }
        }

        for (dir, contents) in &subdirs {
            let subtree = self.write_tree(contents);
            builder.insert(dir.as_str(), subtree, 0o040000).unwrap();
        }

        builder.write().unwrap()
    }

    /// Commit on `branch`, writing (`Some`) or deleting (`None`) files
    /// relative to the branch's current tip.
    pub fn commit(&self, branch: &str, changes: &[(&str, Option<&[u8]>)], message: &str) -> Oid {
        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .find_reference(&refname)
            .ok()
            .map(|r| r.peel_to_commit().unwrap());

        let mut files = parent
            .as_ref()
            .map(|c| self.tree_files(c))
            .unwrap_or_default();
        for (path, data) in changes {
            match data {
                Some(data) => {
                    files.insert(path.to_string(), data.to_vec());
                }
                None => {
                    files.remove(*path);
                }
            }
        }

        let tree = self.repo.find_tree(self.write_tree(&files)).unwrap();
        let sig = Signature::now("Tutorial Author", "author@example.com").unwrap();
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some(&refname), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Merge `other` into `branch`, keeping `branch`'s tree plus `changes`.
    pub fn merge(
        &self,
        branch: &str,
        other: &str,
        changes: &[(&str, Option<&[u8]>)],
        message: &str,
    ) -> Oid {
        let refname = format!("refs/heads/{}", branch);
        let first = self.repo.find_reference(&refname).unwrap().peel_to_commit().unwrap();
        let second = self
            .repo
            .find_reference(&format!("refs/heads/{}", other))
            .unwrap()
            .peel_to_commit()
            .unwrap();

        let mut files = self.tree_files(&first);
        for (path, data) in changes {
            match data {
                Some(data) => {
                    files.insert(path.to_string(), data.to_vec());
                }
                None => {
                    files.remove(*path);
                }
            }
        }

        let tree = self.repo.find_tree(self.write_tree(&files)).unwrap();
        let sig = Signature::now("Tutorial Author", "author@example.com").unwrap();
        self.repo
            .commit(Some(&refname), &sig, &sig, message, &tree, &[&first, &second])
            .unwrap()
    }

    /// Commit `index.yaml` on the recipes branch and mirror it into the
    /// working directory.
    pub fn commit_index(&self, yaml: &str) -> Oid {
        std::fs::write(self.path().join("index.yaml"), yaml).unwrap();
        self.commit(
            RECIPES_BRANCH,
            &[("index.yaml", Some(yaml.as_bytes()))],
            "Update index",
        )
    }
}

pub struct BunnerOids {
    pub base: Oid,
    pub assets: Oid,
    pub add_rabbit: Oid,
    pub rabbit_moves: Oid,
    pub text: Oid,
}

/// The canonical five-commit `bunner` tutorial on `branch`.
pub fn build_bunner(repo: &TutorialRepo, branch: &str) -> BunnerOids {
    let base = repo.commit(
        branch,
        &[
            ("bunner/code.py", Some(BASE_CODE.as_bytes())),
            ("bunner/tutorial.md", Some(b"# Bunner\n".as_slice())),
            ("bunner/summary.md", Some(SUMMARY_TEXT.as_bytes())),
        ],
        "{base} Start Bunner",
    );
    let assets = repo.commit(
        branch,
        &[("bunner/project-assets/images/rabbit.png", Some(RABBIT_PNG))],
        "Add rabbit graphics",
    );
    let add_rabbit = repo.commit(
        branch,
        &[("bunner/code.py", Some(RABBIT_CODE.as_bytes()))],
        "{#add-rabbit} Add Rabbit sprite",
    );
    let rabbit_moves = repo.commit(
        branch,
        &[("bunner/code.py", Some(HOPPING_RABBIT_CODE.as_bytes()))],
        "{#rabbit-moves} Let the rabbit hop",
    );
    let text = repo.commit(
        branch,
        &[("bunner/tutorial.md", Some(FINAL_TUTORIAL_TEXT.as_bytes()))],
        "Describe the rabbit",
    );

    BunnerOids {
        base,
        assets,
        add_rabbit,
        rabbit_moves,
        text,
    }
}

/// A minimal two-commit tutorial in directory `dir` on `branch`.
pub fn build_minimal(repo: &TutorialRepo, branch: &str, dir: &str) -> Oid {
    let code_path = format!("{}/code.py", dir);
    let text_path = format!("{}/tutorial.md", dir);
    repo.commit(
        branch,
        &[
            (code_path.as_str(), Some(b"import pytch\n".as_slice())),
            (text_path.as_str(), Some(b"# Start\n".as_slice())),
        ],
        "{base} Start",
    );
    let text = format!("# {}\n\nA short tutorial.\n", dir);
    repo.commit(
        branch,
        &[(text_path.as_str(), Some(text.as_bytes()))],
        "Write tutorial",
    )
}
