use serde::{Deserialize, Serialize};
use std::fmt;

/// What the assistant decided to do with a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ChatReply,
    RunCommand,
    AskClarification,
    /// Anything else a model came up with; reported and rejected by the caller.
    Other(String),
}

impl Intent {
    /// Parses a wire name. Blank input yields `None` so callers can apply a default.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(match name {
            "chat_reply" => Intent::ChatReply,
            "run_command" => Intent::RunCommand,
            "ask_clarification" => Intent::AskClarification,
            other => Intent::Other(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Intent::ChatReply => "chat_reply",
            Intent::RunCommand => "run_command",
            Intent::AskClarification => "ask_clarification",
            Intent::Other(name) => name,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single decision produced for a query.
///
/// `command` is `Some` exactly when `intent` is [`Intent::RunCommand`].
/// `skill_origin` is set when the plan came from a rule-based skill rather
/// than from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    pub intent: Intent,
    pub explanation: Option<String>,
    pub command: Option<String>,
    pub needs_summary: bool,
    pub response: Option<String>,
    pub skill_origin: Option<Intent>,
}

impl ActionPlan {
    pub fn run_command(command: impl Into<String>, explanation: Option<String>) -> Self {
        Self {
            intent: Intent::RunCommand,
            explanation,
            command: Some(command.into()),
            needs_summary: true,
            response: None,
            skill_origin: None,
        }
    }
}

/// What a skill hands back to the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillResult {
    /// Unset means `run_command`.
    pub intent: Option<Intent>,
    pub command: Option<String>,
    pub response: Option<String>,
    pub explanation: Option<String>,
    pub needs_summary: bool,
}

impl SkillResult {
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            intent: Some(Intent::ChatReply),
            response: Some(message.into()),
            ..Default::default()
        }
    }
}

/// One remembered interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl HistoryEntry {
    pub fn new(query: impl Into<String>, command: impl Into<String>, output: Option<String>) -> Self {
        Self {
            query: query.into(),
            command: command.into(),
            output,
        }
    }

    pub fn has_output(&self) -> bool {
        self.output.as_deref().is_some_and(|o| !o.is_empty())
    }
}

/// Outcome of running one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Safe,
    Dangerous,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_parse_known_and_unknown() {
        assert_eq!(Intent::parse("run_command"), Some(Intent::RunCommand));
        assert_eq!(Intent::parse(" chat_reply "), Some(Intent::ChatReply));
        assert_eq!(
            Intent::parse("ask_clarification"),
            Some(Intent::AskClarification)
        );
        assert_eq!(
            Intent::parse("dance"),
            Some(Intent::Other("dance".to_string()))
        );
        assert_eq!(Intent::parse("   "), None);
    }

    #[test]
    fn history_entry_omits_missing_output() {
        let entry = HistoryEntry::new("q", "ls", None);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"query":"q","command":"ls"}"#);
    }
}
