use crate::error::PlanError;
use crate::history::ContextStore;
use crate::llm::LanguageModelProvider;
use crate::skills::SkillManager;
use crate::types::{ActionPlan, HistoryEntry, Intent, SkillResult};
use regex::Regex;
use std::sync::LazyLock;

const EMPTY_HISTORY: &str = "(none)";
const FALLBACK_EXPLANATION: &str = "I'll run the generated command to fulfil the request.";

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").expect("fence pattern must compile"));
static PROMPT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$#>]\s*").expect("prompt marker pattern must compile"));

/// How a model response was turned into a plan.
#[derive(Debug)]
pub enum ParseOutcome {
    Structured(ActionPlan),
    /// Not JSON, but the first line looked like a command.
    FallbackCommand(String),
    Failure(PlanError),
}

impl ParseOutcome {
    pub fn into_plan(self) -> Result<ActionPlan, PlanError> {
        match self {
            ParseOutcome::Structured(plan) => Ok(plan),
            ParseOutcome::FallbackCommand(command) => Ok(ActionPlan::run_command(
                command,
                Some(FALLBACK_EXPLANATION.to_string()),
            )),
            ParseOutcome::Failure(e) => Err(e),
        }
    }
}

/// Turns a query into exactly one plan, via a skill when possible.
pub struct Planner<'a> {
    skills: SkillManager,
    store: &'a ContextStore,
    llm: &'a dyn LanguageModelProvider,
}

impl<'a> Planner<'a> {
    pub fn new(skills: SkillManager, store: &'a ContextStore, llm: &'a dyn LanguageModelProvider) -> Self {
        Self { skills, store, llm }
    }

    /// `None` means no plan could be produced; the reason has been logged.
    pub fn plan(&self, query: &str) -> Option<ActionPlan> {
        let history = self.store.load();

        if let Some((skill, result)) = self.skills.handle(query, &history) {
            tracing::debug!("planned by skill {}", skill);
            return Some(plan_from_skill(result));
        }

        let prompt = build_prompt(query, &history);
        let response = match self.llm.generate(&prompt) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} failed while planning: {}", self.llm.name(), e);
                return None;
            }
        };

        match parse_plan(&response).into_plan() {
            Ok(plan) => Some(plan),
            Err(e) => {
                tracing::warn!("could not parse plan: {}", e);
                None
            }
        }
    }
}

pub fn plan_from_skill(result: SkillResult) -> ActionPlan {
    let intent = result.intent.unwrap_or(Intent::RunCommand);
    let command = if intent == Intent::RunCommand {
        result.command
    } else {
        None
    };
    ActionPlan {
        skill_origin: Some(intent.clone()),
        intent,
        explanation: result.explanation,
        command,
        needs_summary: result.needs_summary,
        response: result.response,
    }
}

/// Chronological `user:`/`command:`/`output:` blocks separated by blank lines.
pub fn format_history(history: &[HistoryEntry]) -> String {
    let blocks: Vec<String> = history
        .iter()
        .map(|entry| {
            let mut block = format!("user: {}", entry.query);
            if !entry.command.is_empty() {
                block.push_str(&format!("\ncommand: {}", entry.command));
            }
            if let Some(output) = entry.output.as_deref().filter(|o| !o.is_empty()) {
                block.push_str(&format!("\noutput: {}", output));
            }
            block
        })
        .collect();

    let rendered = blocks.join("\n\n");
    if rendered.trim().is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        rendered
    }
}

pub fn build_prompt(query: &str, history: &[HistoryEntry]) -> String {
    let history_section = format_history(history);
    format!(
        r#"You are an agent with access to a Linux terminal. Decide the next action for the user's request.
If a command is needed, explain its purpose first. Otherwise answer directly in natural language.

Output your plan as JSON with these fields:
{{
  "intent": "chat_reply" | "run_command" | "ask_clarification",
  "explanation": "what you are going to do, or your answer",
  "command": "the command to run when intent=run_command",
  "needs_summary": true or false
}}

For intent=chat_reply fill only explanation (add a "response" field if needed). If you need more information, use intent=ask_clarification and put the question in explanation.
Commands must be safe, single-line and runnable directly in a shell.

History:
{history_section}

User query: {query}

Respond with JSON only:"#,
        history_section = history_section,
        query = query
    )
}

/// Removes a leading ```lang fence and a trailing ``` fence.
pub fn strip_code_fences(response: &str) -> &str {
    let mut cleaned = response.trim();
    if let Some(m) = OPENING_FENCE.find(cleaned) {
        cleaned = cleaned[m.end()..].trim();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim();
    }
    cleaned
}

pub fn parse_plan(response: &str) -> ParseOutcome {
    let cleaned = strip_code_fences(response);

    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(value) => match structured_plan(&value) {
            Ok(plan) => ParseOutcome::Structured(plan),
            Err(e) => ParseOutcome::Failure(e),
        },
        Err(decode_err) => match extract_command_line(cleaned) {
            Some(command) => {
                tracing::debug!("plan was not JSON ({}), using first line as command", decode_err);
                ParseOutcome::FallbackCommand(command)
            }
            None => ParseOutcome::Failure(PlanError::Unparseable(decode_err.to_string())),
        },
    }
}

fn structured_plan(value: &serde_json::Value) -> Result<ActionPlan, PlanError> {
    let object = value.as_object().ok_or(PlanError::NotAnObject)?;
    let text = |key: &str| object.get(key).and_then(|v| v.as_str()).map(String::from);

    let intent = object
        .get("intent")
        .and_then(|v| v.as_str())
        .and_then(Intent::parse)
        .unwrap_or(Intent::RunCommand);
    let is_command = intent == Intent::RunCommand;

    let command = if is_command {
        let command = text("command")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(PlanError::MissingCommand)?;
        Some(command)
    } else {
        None
    };

    Ok(ActionPlan {
        // only an absent field defaults; null or a non-bool reads as false
        needs_summary: match object.get("needs_summary") {
            Some(value) => value.as_bool().unwrap_or(false),
            None => is_command,
        },
        explanation: text("explanation"),
        response: text("response"),
        command,
        intent,
        skill_origin: None,
    })
}

/// First non-blank line with one leading `$`, `#` or `>` removed.
fn extract_command_line(response: &str) -> Option<String> {
    let line = response.lines().map(str::trim).find(|l| !l.is_empty())?;
    let command = PROMPT_MARKER.replace(line, "").trim().to_string();
    (!command.is_empty()).then_some(command)
}
