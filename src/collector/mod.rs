//! # Source Collector Module
//!
//! Clones the tutorial git repository, removes paths that should not reach the
//! index, and converts the contained Jupyter notebooks to Markdown through
//! `jupyter nbconvert`. The produced Markdown lands in `docs_md/` inside the
//! repository and feeds the document store builder.
//!
//! Collection is deliberately tolerant: a failed pull keeps the existing
//! checkout, cleanup is best-effort, and conversion failures leave partial
//! output rather than aborting the run.

mod error;
mod html;

pub use error::CollectError;
pub use html::strip_html_blocks;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Paths removed from the cloned repository before conversion
pub const DEFAULT_UNWANTED: [&str; 4] = ["data", "LICENSE", ".gitignore", "README.MD"];

/// Subdirectory of the repository receiving converted Markdown
pub const MARKDOWN_SUBDIR: &str = "docs_md";

/// Collects a git tutorial repository into a Markdown corpus
#[derive(Debug, Clone)]
pub struct RepoCollector {
    repo_url: String,
    repo_path: PathBuf,
}

impl RepoCollector {
    pub fn new(repo_url: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_url: repo_url.into(),
            repo_path: repo_path.into(),
        }
    }

    /// Directory the converted Markdown files are written to.
    pub fn markdown_dir(&self) -> PathBuf {
        self.repo_path.join(MARKDOWN_SUBDIR)
    }

    /// Clone the repository, or pull the latest changes if it already exists.
    ///
    /// A failing pull is logged and ignored so a stale checkout still converts.
    #[instrument(skip(self), fields(url = %self.repo_url))]
    pub async fn ensure_repo(&self) -> Result<(), CollectError> {
        if !self.repo_path.is_dir() {
            info!("Cloning {} into {}", self.repo_url, self.repo_path.display());
            let status = Command::new("git")
                .args(["clone", &self.repo_url])
                .arg(&self.repo_path)
                .status()
                .await
                .map_err(|e| CollectError::Git(format!("failed to run git clone: {}", e)))?;
            if !status.success() {
                return Err(CollectError::Git(format!(
                    "git clone exited with status {}",
                    status
                )));
            }
        } else {
            info!(
                "Repository {} already cloned, pulling latest changes",
                self.repo_path.display()
            );
            let result = Command::new("git")
                .args(["pull", "origin", "main"])
                .current_dir(&self.repo_path)
                .status()
                .await;
            match result {
                Ok(status) if status.success() => {}
                Ok(status) => warn!("git pull exited with status {}, continuing", status),
                Err(e) => warn!("git pull failed to run: {}, continuing", e),
            }
        }
        Ok(())
    }

    /// Remove the listed paths under the repository, tolerating absence.
    #[instrument(skip(self, names))]
    pub async fn strip_unwanted(&self, names: &[&str]) -> Result<(), CollectError> {
        for name in names {
            let path = self.repo_path.join(name);
            let removed = if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match removed {
                Ok(()) => debug!("Removed {}", path.display()),
                // Best-effort cleanup; missing or locked paths are fine.
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    /// Convert every notebook directly under the repository to Markdown.
    ///
    /// Conversion runs `jupyter nbconvert` per notebook into `docs_md/`. Exit
    /// status is not treated as fatal; a failed notebook simply produces no
    /// output file. With `strip_html`, every produced Markdown file is
    /// rewritten with embedded `<div>` blocks removed.
    #[instrument(skip(self))]
    pub async fn convert_notebooks(
        &self,
        verbose: bool,
        strip_html: bool,
    ) -> Result<(), CollectError> {
        let notebooks = list_by_extension(&self.repo_path, "ipynb").await?;
        info!(
            "Found {} notebooks in {}",
            notebooks.len(),
            self.repo_path.display()
        );

        let md_dir = self.markdown_dir();
        tokio::fs::create_dir_all(&md_dir).await?;

        let pb = progress_bar(notebooks.len() as u64, "Converting notebooks");
        for notebook in &notebooks {
            pb.set_message(format!(
                "Converting {}",
                notebook.file_name().unwrap_or_default().to_string_lossy()
            ));

            let mut cmd = Command::new("jupyter");
            cmd.arg("nbconvert")
                .args(["--to", "markdown"])
                .arg(notebook)
                .arg("--output-dir")
                .arg(&md_dir);
            if !verbose {
                cmd.stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null());
            }

            // Failures are tolerated; partial output is acceptable here.
            match cmd.status().await {
                Ok(status) if !status.success() => {
                    warn!("nbconvert exited with {} for {}", status, notebook.display())
                }
                Ok(_) => {}
                Err(e) => warn!("nbconvert failed to run for {}: {}", notebook.display(), e),
            }
            pb.inc(1);
        }
        pb.finish_with_message("Conversion finished");

        if strip_html {
            self.strip_converted_html(&md_dir).await?;
        }

        Ok(())
    }

    async fn strip_converted_html(&self, md_dir: &Path) -> Result<(), CollectError> {
        let files = list_by_extension(md_dir, "md").await?;
        let pb = progress_bar(files.len() as u64, "Stripping embedded HTML");
        for file in &files {
            pb.set_message(format!(
                "Cleaning {}",
                file.file_name().unwrap_or_default().to_string_lossy()
            ));
            let content = tokio::fs::read_to_string(file).await?;
            let cleaned = strip_html_blocks(&content);
            if cleaned.len() != content.len() {
                tokio::fs::write(file, cleaned).await?;
            }
            pb.inc(1);
        }
        pb.finish_with_message("HTML stripped");
        Ok(())
    }
}

/// List files directly under `dir` with the given extension.
async fn list_by_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, CollectError> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == extension) {
            files.push(path);
        }
    }
    Ok(files)
}

fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message(message);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_strip_unwanted_tolerates_absence() {
        let dir = tempdir().unwrap();
        let collector = RepoCollector::new("https://example.com/repo.git", dir.path());

        // Nothing exists yet; must not error.
        collector
            .strip_unwanted(&DEFAULT_UNWANTED)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_strip_unwanted_removes_files_and_dirs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("x.csv"), "1,2").unwrap();
        std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
        std::fs::write(dir.path().join("keep.ipynb"), "{}").unwrap();

        let collector = RepoCollector::new("https://example.com/repo.git", dir.path());
        collector
            .strip_unwanted(&DEFAULT_UNWANTED)
            .await
            .unwrap();

        assert!(!dir.path().join("data").exists());
        assert!(!dir.path().join("LICENSE").exists());
        assert!(dir.path().join("keep.ipynb").exists());
    }

    #[tokio::test]
    async fn test_list_by_extension_filters() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.ipynb"), "{}").unwrap();
        std::fs::write(dir.path().join("b.ipynb"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.md"), "#").unwrap();

        let notebooks = list_by_extension(dir.path(), "ipynb").await.unwrap();
        assert_eq!(notebooks.len(), 2);
        assert!(notebooks.iter().all(|p| p.extension().unwrap() == "ipynb"));
    }

    #[test]
    fn test_markdown_dir() {
        let collector = RepoCollector::new("u", "/tmp/repo");
        assert_eq!(collector.markdown_dir(), PathBuf::from("/tmp/repo/docs_md"));
    }
}
