//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected files and directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Create the directory holding `data_file`; warn when the optional
/// `catalog_file` is missing (built-in defaults are used then).
pub async fn ensure_env(data_file: &str, catalog_file: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(catalog_file).await.is_err() {
        warn!(%catalog_file, "class catalog not found; using built-in classes");
    }
    if let Some(dir) = Path::new(data_file).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_data_directory() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("env_check_{}", uuid::Uuid::new_v4()));
        let data = root.join("nested").join("school_data.json");
        let data = data.to_string_lossy().into_owned();
        ensure_env(&data, "does-not-exist.json").await?;
        assert!(root.join("nested").is_dir());
        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn bare_file_name_needs_no_directory() -> anyhow::Result<()> {
        ensure_env("school_data.json", "classes.json").await
    }
}
