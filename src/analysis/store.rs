use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::result::SessionResult;

/// Name of the single handoff slot read by the results view
pub const RESULTS_SLOT: &str = "interviewResults";

/// Persistent handoff slot holding the latest session result as JSON
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", RESULTS_SLOT)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the slot contents
    pub fn save(&self, result: &SessionResult) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create results directory")?;
        }

        let json = serde_json::to_vec_pretty(result)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!("Saved session {} to {}", result.session_id(), self.path.display());
        Ok(())
    }

    /// Read the slot; `None` when nothing has been saved
    pub fn load(&self) -> Result<Option<SessionResult>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let result = serde_json::from_slice(&json).context("Stored session result is invalid")?;
        Ok(Some(result))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}
