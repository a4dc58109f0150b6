//! File system utilities.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Writes `content` to `path` through a temporary sibling file and a rename,
/// so readers never observe a half-written page. Missing parent directories
/// are created.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = parent.join(format!(".{file_name}.tmp"));

    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| {
        let _ = fs::remove_file(&temp_path);
        format!("Failed to replace file: {}", path.display())
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_overwrites_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.html");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, "<p>Hola</p>").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>Hola</p>");
        assert!(!temp_dir.path().join(".page.html.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("nested").join("page.html");

        atomic_write(&path, "こんにちは").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "こんにちは");
    }
}
