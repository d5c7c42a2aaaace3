use crate::ToolDispatchError;

/// What the executor does when a registered tool returns an error.
///
/// Unknown tool names and tool timeouts are never reported back; they always
/// end the turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolFailurePolicy {
    #[default]
    FailFast,
    /// Hand the error text to the model as the observation so it can retry.
    ReportToModel,
}

impl ToolFailurePolicy {
    pub(crate) fn observation_for(&self, error: &ToolDispatchError) -> Option<String> {
        match (self, error) {
            (
                ToolFailurePolicy::ReportToModel,
                ToolDispatchError::Execution { name, source, .. },
            ) => Some(format!("Error running tool '{name}': {source}")),
            _ => None,
        }
    }
}
