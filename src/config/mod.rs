pub mod storage;
pub mod toml_config;

use crate::domain::ports::{CompileSettings, ConfigProvider, GatherSettings};
use crate::tutorial::release::DEFAULT_RELEASES_BRANCH;
use crate::utils::error::{BuildError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use toml_config::BuildSettings;

pub const DEFAULT_TIP_REVISION: &str = "HEAD";
pub const DEFAULT_INDEX_FILE: &str = "index.yaml";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Options shared by every pytchbuild tool.
#[derive(Debug, Clone, Args)]
pub struct CommonOptions {
    /// Where to write the zipfile
    #[arg(short = 'o', long = "output-file", value_name = "PATH")]
    pub output_file: String,

    /// Path to root of git repository
    #[arg(short = 'r', long, env = "GIT_DIR", value_name = "PATH")]
    pub repository_path: Option<PathBuf>,

    /// TOML settings file (defaults to ./pytchbuild.toml if present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonOptions {
    /// Fill in the repository path from the settings file, or failing that
    /// by discovering a repository from the current directory.
    fn resolve_repository(&mut self, settings: &BuildSettings) -> Result<()> {
        if self.repository_path.is_none() {
            self.repository_path = settings.repository.path.clone();
        }
        if self.repository_path.is_none() {
            let discovered =
                git2::Repository::discover(".").map_err(|e| BuildError::RepositoryNotFound {
                    message: e.message().to_string(),
                })?;
            tracing::debug!("Discovered repository at {}", discovered.path().display());
            self.repository_path = Some(discovered.path().to_path_buf());
        }
        Ok(())
    }

    fn validate_common(&self) -> Result<()> {
        validation::validate_path("output_file", &self.output_file)?;
        let repository_path = validation::validate_required_field("repository_path", &self.repository_path)?;
        validation::validate_path("repository_path", &repository_path.to_string_lossy())?;
        Ok(())
    }

    fn repository(&self) -> &Path {
        self.repository_path.as_deref().unwrap_or(Path::new("."))
    }
}

/// Compile one tutorial's history into a zipfile.
#[derive(Debug, Clone, Parser)]
#[command(name = "pytchbuild")]
#[command(about = "Compile a Pytch tutorial from its git history into a zipfile")]
pub struct CompileConfig {
    #[command(flatten)]
    pub common: CommonOptions,

    /// Revision (e.g., branch name) at tip of tutorial [default: HEAD]
    #[arg(short = 'b', long, value_name = "REVISION")]
    pub tip_revision: Option<String>,
}

impl CompileConfig {
    /// Merge in the settings file and discover the repository if needed.
    pub fn resolve(&mut self) -> Result<()> {
        let settings = BuildSettings::load(self.common.config_file.as_deref())?;
        settings.validate()?;

        if self.tip_revision.is_none() {
            self.tip_revision = settings.compile.tip_revision.clone();
        }
        self.common.resolve_repository(&settings)
    }
}

impl Validate for CompileConfig {
    fn validate(&self) -> Result<()> {
        self.common.validate_common()?;
        validation::validate_non_empty_string("tip_revision", self.tip_revision())
    }
}

impl ConfigProvider for CompileConfig {
    fn repository_path(&self) -> &Path {
        self.common.repository()
    }

    fn output_path(&self) -> &str {
        &self.common.output_file
    }
}

impl CompileSettings for CompileConfig {
    fn tip_revision(&self) -> &str {
        self.tip_revision.as_deref().unwrap_or(DEFAULT_TIP_REVISION)
    }
}

/// Gather the tutorials listed in the index into one zipfile.
#[derive(Debug, Clone, Parser)]
#[command(name = "pytchbuild-gather-tutorials")]
#[command(about = "Gather the tutorials listed in index.yaml into one zipfile")]
pub struct GatherConfig {
    #[command(flatten)]
    pub common: CommonOptions,

    /// Make a commit to the releases branch
    #[arg(long = "make-release", overrides_with = "no_make_release")]
    pub make_release: bool,

    /// Do not make a release commit (the default)
    #[arg(long = "no-make-release")]
    pub no_make_release: bool,

    /// Index of tutorials, relative to the repository's working directory [default: index.yaml]
    #[arg(long, value_name = "FILE")]
    pub index_file: Option<String>,

    /// Branch to record releases on [default: releases]
    #[arg(long, value_name = "BRANCH")]
    pub releases_branch: Option<String>,
}

impl GatherConfig {
    pub fn resolve(&mut self) -> Result<()> {
        let settings = BuildSettings::load(self.common.config_file.as_deref())?;
        settings.validate()?;

        if self.index_file.is_none() {
            self.index_file = settings.gather.index_file.clone();
        }
        if self.releases_branch.is_none() {
            self.releases_branch = settings.gather.releases_branch.clone();
        }
        self.common.resolve_repository(&settings)
    }
}

impl Validate for GatherConfig {
    fn validate(&self) -> Result<()> {
        self.common.validate_common()?;
        validation::validate_file_extension("index_file", self.index_file(), &["yaml", "yml"])?;
        validation::validate_branch_name("releases_branch", self.releases_branch())
    }
}

impl ConfigProvider for GatherConfig {
    fn repository_path(&self) -> &Path {
        self.common.repository()
    }

    fn output_path(&self) -> &str {
        &self.common.output_file
    }
}

impl GatherSettings for GatherConfig {
    fn index_file(&self) -> &str {
        self.index_file.as_deref().unwrap_or(DEFAULT_INDEX_FILE)
    }

    fn make_release(&self) -> bool {
        self.make_release && !self.no_make_release
    }

    fn releases_branch(&self) -> &str {
        self.releases_branch
            .as_deref()
            .unwrap_or(DEFAULT_RELEASES_BRANCH)
    }
}

/// Recompile a tutorial whenever the repository's refs change.
#[derive(Debug, Clone, Parser)]
#[command(name = "pytchbuild-watch")]
#[command(about = "Rebuild a Pytch tutorial zipfile whenever its repository changes")]
pub struct WatchConfig {
    #[command(flatten)]
    pub compile: CompileConfig,

    /// Quiet period after a change before rebuilding [default: 500]
    #[arg(long, value_name = "MILLISECONDS")]
    pub debounce_ms: Option<u64>,
}

impl WatchConfig {
    pub fn resolve(&mut self) -> Result<()> {
        let settings = BuildSettings::load(self.compile.common.config_file.as_deref())?;
        if self.debounce_ms.is_none() {
            self.debounce_ms = settings.watch.debounce_ms;
        }
        self.compile.resolve()
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }
}

impl Validate for WatchConfig {
    fn validate(&self) -> Result<()> {
        self.compile.validate()?;
        validation::validate_positive_number("debounce_ms", self.debounce_ms(), 1)
    }
}
