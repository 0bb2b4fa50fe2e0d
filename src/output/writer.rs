// src/output/writer.rs
//! Exporters performing the actual output I/O.
//!
//! This module is the only place where output file I/O occurs; manifests
//! have their own stores.

use crate::error::AppError;
use crate::pipeline::{ChainData, Exporter};
use std::io::Write;
use std::path::{Path, PathBuf};

fn rendered(data: &ChainData) -> Result<&str, AppError> {
    data.content.as_deref().ok_or_else(|| AppError::InternalError {
        message: format!("nothing rendered for {}", data.document_id),
        source: None,
    })
}

/// Writes the rendered output to a file, creating parent directories.
#[derive(Debug, Clone)]
pub struct FileExporter {
    path: PathBuf,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Exporter for FileExporter {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn export(&self, data: &ChainData) -> Result<(), AppError> {
        let content = rendered(data)?;
        log::debug!("Writing {} bytes to {}", content.len(), self.path.display());

        // Create parent directories if needed
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;

        log::info!("Wrote file: {}", self.path.display());
        Ok(())
    }
}

/// Prints the rendered output to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutExporter;

#[async_trait::async_trait]
impl Exporter for StdoutExporter {
    fn name(&self) -> String {
        "stdout".to_string()
    }

    async fn export(&self, data: &ChainData) -> Result<(), AppError> {
        let content = rendered(data)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotionId;

    #[tokio::test]
    async fn file_exporter_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out/nested/doc.json");
        let mut data = ChainData::new(NotionId::parse("cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd").unwrap());
        data.content = Some("{}".to_string());

        FileExporter::new(&target).export(&data).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
    }

    #[tokio::test]
    async fn exporting_without_content_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let data = ChainData::new(NotionId::parse("cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd").unwrap());
        assert!(FileExporter::new(tmp.path().join("x")).export(&data).await.is_err());
    }
}
