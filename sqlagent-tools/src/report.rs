use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use sqlagent_agent::{ToolError, TypedTool};

use crate::SqlToolError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteReportArgs {
    pub filename: String,
    pub html: String,
}

/// Writes model-authored HTML into a fixed directory.
pub struct WriteReportTool {
    report_dir: PathBuf,
}

impl WriteReportTool {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, SqlToolError> {
        let relative = Path::new(filename);
        let only_normal = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if filename.trim().is_empty() || !only_normal || relative.file_name().is_none() {
            return Err(SqlToolError::UnsafePath(filename.to_string()));
        }
        Ok(self.report_dir.join(relative))
    }
}

#[async_trait]
impl TypedTool for WriteReportTool {
    type Args = WriteReportArgs;
    type Output = String;

    const NAME: &'static str = "write_report";

    fn description(&self) -> &str {
        "Write an HTML file to disk. Use this tool whenever someone asks for a report."
    }

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        let path = self.resolve(&args.filename)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, args.html.as_bytes()).await?;
        tracing::info!(path = %path.display(), bytes = args.html.len(), "wrote report");

        Ok(format!("Report written to {}", path.display()))
    }
}
