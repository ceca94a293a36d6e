use std::path::PathBuf;

use anyhow::{Context, Result};

/// Expands a leading `~` and resolves the result to an absolute path.
/// The path must exist.
pub fn canonicalize_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(raw).to_string();
    std::fs::canonicalize(&expanded).with_context(|| format!("resolve {raw}"))
}

/// Like `canonicalize_path`, but only the parent has to exist yet.
pub fn absolute_path(raw: &str) -> Result<PathBuf> {
    let expanded = PathBuf::from(shellexpand::tilde(raw).to_string());
    if expanded.exists() {
        return std::fs::canonicalize(&expanded).with_context(|| format!("resolve {raw}"));
    }
    let Some(name) = expanded.file_name() else {
        return Ok(expanded);
    };
    let parent = match expanded.parent() {
        Some(p) if !p.as_os_str().is_empty() => std::fs::canonicalize(p).with_context(|| format!("resolve {raw}"))?,
        _ => std::env::current_dir()?,
    };
    Ok(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolves_existing_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();
        let raw = format!("{}/a/../a", dir.path().display());
        assert_eq!(canonicalize_path(&raw).unwrap(), std::fs::canonicalize(&nested).unwrap());
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(canonicalize_path(&format!("{}/nope", dir.path().display())).is_err());
    }

    #[test]
    fn absolute_path_allows_missing_leaf() {
        let dir = tempdir().unwrap();
        let p = absolute_path(&format!("{}/out", dir.path().display())).unwrap();
        assert_eq!(p, std::fs::canonicalize(dir.path()).unwrap().join("out"));
    }
}
