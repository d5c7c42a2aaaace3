use std::collections::HashMap;

use async_trait::async_trait;
use sqlagent_core::{Message, Role, Runnable, SqlAgentError, Value};

use crate::PromptTemplate;

#[derive(Debug, Clone)]
pub enum MessagePromptTemplate {
    Human(PromptTemplate),
    AI(PromptTemplate),
    System(PromptTemplate),
    /// Splices a list of messages bound under `variable_name`. An unbound
    /// placeholder renders nothing unless it is `required`.
    Placeholder {
        variable_name: String,
        required: bool,
    },
}

impl MessagePromptTemplate {
    pub fn human(template: &str) -> Self {
        Self::Human(PromptTemplate::new(template))
    }

    pub fn ai(template: &str) -> Self {
        Self::AI(PromptTemplate::new(template))
    }

    pub fn system(template: &str) -> Self {
        Self::System(PromptTemplate::new(template))
    }

    pub fn placeholder(variable_name: &str) -> Self {
        Self::Placeholder {
            variable_name: variable_name.to_string(),
            required: false,
        }
    }

    pub fn required_placeholder(variable_name: &str) -> Self {
        Self::Placeholder {
            variable_name: variable_name.to_string(),
            required: true,
        }
    }

    pub fn format(&self, vars: &HashMap<String, Value>) -> Result<Vec<Message>, SqlAgentError> {
        let (role, template) = match self {
            MessagePromptTemplate::Human(t) => (Role::User, t),
            MessagePromptTemplate::AI(t) => (Role::Assistant, t),
            MessagePromptTemplate::System(t) => (Role::System, t),
            MessagePromptTemplate::Placeholder {
                variable_name,
                required,
            } => return format_placeholder(variable_name, *required, vars),
        };

        Ok(vec![Message {
            role,
            content: template.render(vars)?,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }])
    }
}

fn format_placeholder(
    variable_name: &str,
    required: bool,
    vars: &HashMap<String, Value>,
) -> Result<Vec<Message>, SqlAgentError> {
    let Some(value) = vars.get(variable_name) else {
        if required {
            return Err(SqlAgentError::MissingVariable(variable_name.to_string()));
        }
        return Ok(Vec::new());
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value::<Vec<Message>>(value.clone()).map_err(|err| {
            SqlAgentError::ParseFailed {
                output: variable_name.to_string(),
                reason: format!("placeholder is not a list of messages: {err}"),
            }
        }),
        _ => serde_json::from_value::<Message>(value.clone())
            .map(|message| vec![message])
            .map_err(|err| SqlAgentError::ParseFailed {
                output: variable_name.to_string(),
                reason: format!("placeholder is not a message: {err}"),
            }),
    }
}

/// An ordered list of message templates, rendered together into a prompt.
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    messages: Vec<MessagePromptTemplate>,
    partials: HashMap<String, Value>,
}

impl ChatPromptTemplate {
    pub fn new(messages: Vec<MessagePromptTemplate>) -> Self {
        Self {
            messages,
            partials: HashMap::new(),
        }
    }

    /// Bind a variable once; call-time variables with the same name win.
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    pub fn format_messages(
        &self,
        vars: &HashMap<String, Value>,
    ) -> Result<Vec<Message>, SqlAgentError> {
        let merged;
        let vars = if self.partials.is_empty() {
            vars
        } else {
            let mut all = self.partials.clone();
            all.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged = all;
            &merged
        };

        let mut result = Vec::new();
        for tmpl in &self.messages {
            result.extend(tmpl.format(vars)?);
        }
        Ok(result)
    }
}

#[async_trait]
impl Runnable<HashMap<String, Value>, Vec<Message>> for ChatPromptTemplate {
    async fn invoke(&self, input: HashMap<String, Value>) -> Result<Vec<Message>, SqlAgentError> {
        self.format_messages(&input)
    }
}
