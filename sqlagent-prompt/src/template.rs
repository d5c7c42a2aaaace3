use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use sqlagent_core::{SqlAgentError, Value};

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("static pattern is valid"))
}

/// A text template with `{{ name }}` placeholders.
///
/// Rendering is single-pass: substituted values are never re-scanned, so user
/// input containing braces is inserted verbatim.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names referenced by the template, sorted and de-duplicated.
    pub fn input_variables(&self) -> BTreeSet<String> {
        variable_pattern()
            .captures_iter(&self.template)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, SqlAgentError> {
        if let Some(missing) = self
            .input_variables()
            .into_iter()
            .find(|name| !vars.contains_key(name))
        {
            return Err(SqlAgentError::MissingVariable(missing));
        }

        let rendered = variable_pattern().replace_all(&self.template, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }
        });
        Ok(rendered.into_owned())
    }
}
