use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use sqlagent_agent::{ToolError, TypedTool};

use crate::SqlDatabase;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunQueryArgs {
    pub query: String,
}

pub struct RunQueryTool {
    database: SqlDatabase,
}

impl RunQueryTool {
    pub fn new(database: SqlDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TypedTool for RunQueryTool {
    type Args = RunQueryArgs;
    type Output = Vec<Vec<Value>>;

    const NAME: &'static str = "run_sqlite_query";

    fn description(&self) -> &str {
        "Run a sqlite query."
    }

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".to_string()));
        }
        Ok(self.database.run_query(&args.query).await?)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTablesArgs {
    pub table_names: Vec<String>,
}

pub struct DescribeTablesTool {
    database: SqlDatabase,
}

impl DescribeTablesTool {
    pub fn new(database: SqlDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TypedTool for DescribeTablesTool {
    type Args = DescribeTablesArgs;
    type Output = String;

    const NAME: &'static str = "describe_tables";

    fn description(&self) -> &str {
        "Given a list of table names, returns the schema of those tables"
    }

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        Ok(self.database.describe_tables(&args.table_names).await?)
    }
}
