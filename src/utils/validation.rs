use crate::utils::error::{BuildError, Result};
use std::collections::HashSet;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extension(
    field_name: &str,
    file: &str,
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match Path::new(file).extension().and_then(|ext| ext.to_str()) {
        Some(extension) if allowed_set.contains(extension) => Ok(()),
        Some(extension) => Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| BuildError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// A local branch name must form a valid `refs/heads/...` reference.
pub fn validate_branch_name(field_name: &str, branch: &str) -> Result<()> {
    validate_non_empty_string(field_name, branch)?;

    if !git2::Reference::is_valid_name(&format!("refs/heads/{}", branch)) {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: branch.to_string(),
            reason: "Not a valid Git branch name".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output_file", "tutorials.zip").is_ok());
        assert!(validate_path("output_file", "").is_err());
        assert!(validate_path("output_file", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("debounce_ms", 500, 1).is_ok());
        assert!(validate_positive_number("debounce_ms", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("index_file", "index.yaml", &["yaml", "yml"]).is_ok());
        assert!(validate_file_extension("index_file", "index.yml", &["yaml", "yml"]).is_ok());
        assert!(validate_file_extension("index_file", "index.json", &["yaml", "yml"]).is_err());
        assert!(validate_file_extension("index_file", "index", &["yaml", "yml"]).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some(3);
        let absent: Option<i32> = None;
        assert_eq!(*validate_required_field("x", &present).unwrap(), 3);
        assert!(matches!(
            validate_required_field("repository_path", &absent),
            Err(BuildError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_branch_name() {
        assert!(validate_branch_name("releases_branch", "releases").is_ok());
        assert!(validate_branch_name("releases_branch", "release/2024").is_ok());
        assert!(validate_branch_name("releases_branch", "   ").is_err());
        assert!(validate_branch_name("releases_branch", "bad..name").is_err());
        assert!(validate_branch_name("releases_branch", "trailing.lock").is_err());
    }
}
