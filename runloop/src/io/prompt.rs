//! Prompt rendering for one-shot assistant calls.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::types::PermissionRequest;

const ADJUDICATE_TEMPLATE: &str = include_str!("prompts/adjudicate.md");
const AUDIT_REPORT_TEMPLATE: &str = include_str!("prompts/audit_report.md");
const AUDIT_APPLY_TEMPLATE: &str = include_str!("prompts/audit_apply.md");

/// Tool input beyond this many bytes is cut before it reaches the prompt.
pub const TOOL_INPUT_BUDGET_BYTES: usize = 20_000;

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("adjudicate.md", ADJUDICATE_TEMPLATE)
            .expect("adjudicate template should be valid");
        env.add_template("audit_report.md", AUDIT_REPORT_TEMPLATE)
            .expect("audit report template should be valid");
        env.add_template("audit_apply.md", AUDIT_APPLY_TEMPLATE)
            .expect("audit apply template should be valid");
        Self { env }
    }

    pub fn render_adjudication(&self, request: &PermissionRequest) -> Result<String> {
        let tool_input = serde_json::to_string_pretty(&request.tool_input)
            .context("serialize tool input")?;
        let tool_input = truncate_on_char_boundary(&tool_input, TOOL_INPUT_BUDGET_BYTES);
        let template = self.env.get_template("adjudicate.md")?;
        let rendered = template.render(context! {
            tool_name => request.tool_name.trim(),
            tool_input => tool_input,
        })?;
        debug!(bytes = rendered.len(), "rendered adjudication prompt");
        Ok(rendered)
    }

    pub fn render_audit(&self, task: &str, grants: &[String], apply: bool) -> Result<String> {
        let name = if apply {
            "audit_apply.md"
        } else {
            "audit_report.md"
        };
        let template = self.env.get_template(name)?;
        let rendered = template.render(context! {
            task => task.trim(),
            grants => grants,
        })?;
        Ok(rendered)
    }
}

fn truncate_on_char_boundary(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }
    let mut end = budget;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated {} bytes]", &text[..end], text.len() - end)
}
