use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use crossterm::style::{Color, Stylize};
use sqlagent_core::{CallbackHandler, Message, Role, RunContext};

const HEADER: &str = "========= Sending Messages =========";

/// Prints every prompt about to be sent to the model, one colored box per
/// message.
pub struct ConsoleObserver {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl ConsoleObserver {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()), true)
    }

    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    pub fn render(&self, messages: &[Message]) -> String {
        let mut rendered = format!("\n\n{HEADER}\n\n");
        for message in messages {
            for (title, body, color) in boxes_for(message) {
                rendered.push_str(&draw_box(&title, &body, color, self.color));
                rendered.push('\n');
            }
        }
        rendered
    }
}

impl std::fmt::Debug for ConsoleObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleObserver")
            .field("color", &self.color)
            .finish()
    }
}

fn boxes_for(message: &Message) -> Vec<(String, String, Color)> {
    match message.role {
        Role::System => vec![("System".into(), message.content.clone(), Color::Yellow)],
        Role::User => vec![("Human".into(), message.content.clone(), Color::Green)],
        Role::Assistant if !message.tool_calls.is_empty() => message
            .tool_calls
            .iter()
            .map(|call| {
                (
                    "AI".into(),
                    format!("Running tool {} with args {}", call.name, call.args),
                    Color::Cyan,
                )
            })
            .collect(),
        Role::Assistant => vec![("AI".into(), message.content.clone(), Color::Blue)],
        Role::Tool => vec![("Tool Result".into(), message.content.clone(), Color::Magenta)],
    }
}

fn draw_box(title: &str, body: &str, color: Color, styled: bool) -> String {
    let lines: Vec<&str> = if body.is_empty() {
        vec![""]
    } else {
        body.lines().collect()
    };
    let inner = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count() + 2);

    let mut out = String::new();
    out.push_str(&format!(
        "╭─ {title} {}╮\n",
        "─".repeat(inner.saturating_sub(title.chars().count() + 1))
    ));
    for line in &lines {
        let pad = inner - line.chars().count();
        out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(inner + 2)));

    if styled {
        out.with(color).to_string()
    } else {
        out
    }
}

#[async_trait]
impl CallbackHandler for ConsoleObserver {
    async fn on_chat_model_start(&self, _ctx: &RunContext, messages: &[Message]) {
        let rendered = self.render(messages);
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        // Output failures must never affect the run.
        let _ = out.write_all(rendered.as_bytes());
        let _ = out.flush();
    }
}
