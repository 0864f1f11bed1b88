use crate::utils::error::{BuildError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked for in the current directory when no `--config` is given.
pub const DEFAULT_SETTINGS_FILE: &str = "pytchbuild.toml";

/// Optional defaults for the command-line tools, read from a TOML file.
///
/// ```toml
/// [repository]
/// path = "${TUTORIALS_REPO}"
///
/// [compile]
/// tip_revision = "bunner"
///
/// [gather]
/// index_file = "index.yaml"
/// releases_branch = "releases"
///
/// [watch]
/// debounce_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub repository: RepositorySettings,
    pub compile: CompileSection,
    pub gather: GatherSection,
    pub watch: WatchSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSection {
    pub tip_revision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherSection {
    pub index_file: Option<String>,
    pub releases_branch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub debounce_ms: Option<u64>,
}

impl BuildSettings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            BuildError::config(format!(
                "cannot read settings file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| BuildError::config(format!("TOML parsing error: {}", e)))
    }

    /// An explicit file must exist; otherwise use `pytchbuild.toml` if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
                tracing::debug!("Loading settings from {}", DEFAULT_SETTINGS_FILE);
                Self::from_file(DEFAULT_SETTINGS_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Replace `${VAR}` with the value of environment variable `VAR`, if set.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env-var regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl Validate for BuildSettings {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.repository.path {
            validation::validate_path("repository.path", &path.to_string_lossy())?;
        }
        if let Some(revision) = &self.compile.tip_revision {
            validation::validate_non_empty_string("compile.tip_revision", revision)?;
        }
        if let Some(index_file) = &self.gather.index_file {
            validation::validate_file_extension("gather.index_file", index_file, &["yaml", "yml"])?;
        }
        if let Some(branch) = &self.gather.releases_branch {
            validation::validate_branch_name("gather.releases_branch", branch)?;
        }
        if let Some(debounce_ms) = self.watch.debounce_ms {
            validation::validate_positive_number("watch.debounce_ms", debounce_ms, 1)?;
        }
        Ok(())
    }
}
