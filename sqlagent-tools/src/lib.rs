//! SQLite-backed tools for the agent: run a query, describe tables, and
//! write an HTML report.

pub mod database;
pub mod error;
pub mod report;
pub mod sql;

use std::path::PathBuf;
use std::sync::Arc;

use sqlagent_agent::{ToolRegistryBuilder, TypedToolAdapter};
use sqlagent_core::Tool;

pub use database::{SqlDatabase, SqlDatabaseBuilder};
pub use error::SqlToolError;
pub use report::{WriteReportArgs, WriteReportTool};
pub use sql::{DescribeTablesArgs, DescribeTablesTool, RunQueryArgs, RunQueryTool};

/// The three model-facing tools over one database and report directory.
#[derive(Debug, Clone)]
pub struct SqlToolkit {
    database: SqlDatabase,
    report_dir: PathBuf,
}

impl SqlToolkit {
    pub fn new(database: SqlDatabase, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            database,
            report_dir: report_dir.into(),
        }
    }

    pub fn database(&self) -> &SqlDatabase {
        &self.database
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(TypedToolAdapter::new(RunQueryTool::new(self.database.clone()))),
            Arc::new(TypedToolAdapter::new(DescribeTablesTool::new(
                self.database.clone(),
            ))),
            Arc::new(TypedToolAdapter::new(WriteReportTool::new(
                self.report_dir.clone(),
            ))),
        ]
    }

    pub fn register(&self, builder: ToolRegistryBuilder) -> ToolRegistryBuilder {
        self.tools()
            .into_iter()
            .fold(builder, |builder, tool| builder.register_arc(tool))
    }
}
