use super::{Keywords, Skill, SkillContext};
use crate::error::SkillError;
use crate::history::truncate_middle;
use crate::types::SkillResult;
use regex::Regex;
use std::sync::LazyLock;

const SNIPPET_LIMIT: usize = 600;
const NO_OUTPUT: &str = "(no output to quote)";

static CAPACITY: LazyLock<Keywords> = LazyLock::new(|| {
    Keywords::new(
        &["够用", "足够", "够不够", "行不行", "是否够", "够吗"],
        &["enough", "sufficient"],
    )
});

static ACTION: LazyLock<Keywords> = LazyLock::new(|| {
    Keywords::new(
        &[
            "执行了什么",
            "执行了啥",
            "做了什么",
            "做了啥",
            "运行了什么",
            "运行了啥",
            "你执行",
            "你刚才",
            "刚才干嘛",
            "上一条命令",
            "上一个命令",
            "什么操作",
            "哪个命令",
            "你做",
            "你干嘛",
            "你干了啥",
        ],
        &[
            "what did you run",
            "what did you do",
            "what did you just",
            "what did you execute",
            "last command",
            "previous command",
            "which command",
        ],
    )
});

static EXPLAIN: LazyLock<Keywords> = LazyLock::new(|| {
    Keywords::new(
        &["分析", "什么意思", "啥意思", "解释", "看法", "如何看", "怎么看"],
        &[
            "explain",
            "analyze",
            "analyse",
            "what does that mean",
            "what does it mean",
            "interpret",
        ],
    )
});

static MEMORY_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(Gi|GB|G|Mi|MB)").expect("memory size pattern must compile")
});

/// The three kinds of follow-up question, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowupIntent {
    Capacity,
    Action,
    Explain,
}

impl FollowupIntent {
    pub fn detect(query: &str) -> Option<Self> {
        if CAPACITY.matches(query) {
            Some(Self::Capacity)
        } else if ACTION.matches(query) {
            Some(Self::Action)
        } else if EXPLAIN.matches(query) {
            Some(Self::Explain)
        } else {
            None
        }
    }
}

/// Answers questions about the previous interaction from history alone.
pub struct FollowupAnalysisSkill;

impl Skill for FollowupAnalysisSkill {
    fn name(&self) -> &'static str {
        "followup_analysis"
    }

    fn matches(&self, query: &str, _ctx: &SkillContext<'_>) -> Result<bool, SkillError> {
        Ok(FollowupIntent::detect(query).is_some())
    }

    fn build(&self, query: &str, ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError> {
        let message = match FollowupIntent::detect(query) {
            Some(FollowupIntent::Capacity) => capacity_response(query, ctx),
            Some(FollowupIntent::Action) => action_response(ctx),
            Some(FollowupIntent::Explain) => explain_response(query, ctx),
            None => {
                return Err(SkillError::Failed {
                    skill: self.name().to_string(),
                    reason: "query is not a follow-up".to_string(),
                })
            }
        };
        Ok(SkillResult::reply(message))
    }
}

fn capacity_response(query: &str, ctx: &SkillContext<'_>) -> String {
    let Some(latest) = ctx.latest_with_output() else {
        return format!(
            "You asked \"{}\". I need a recent resource reading (for example `trae show memory usage`) \
             before I can judge whether it is enough. Please run one first.",
            query
        );
    };

    let output = latest.output.as_deref().unwrap_or_default();
    let finding = match extract_memory_value(output) {
        Some(value) => format!("The latest output shows about {} of total memory.", value),
        None => "I could not find an explicit memory size in the latest output.".to_string(),
    };

    format!(
        "Based on the output of the last command ({}):\n{}\n\n{}\n\
         Whether that is \"enough\" depends on your workload. For everyday development or office work \
         it is usually plenty; for large models, heavy data processing or several VMs at once, \
         describe the target workload and I can give a more specific answer.",
        latest.command,
        snippet(output),
        finding
    )
}

fn action_response(ctx: &SkillContext<'_>) -> String {
    let Some(latest) = ctx.latest() else {
        return "No command has been executed yet, so there is nothing to recap. Ask me to run one first."
            .to_string();
    };

    let mut lines = vec![
        "Summary of the last command:".to_string(),
        format!("- command: {}", latest.command),
    ];
    if !latest.query.is_empty() {
        lines.push(format!("- request: {}", latest.query));
    }
    match latest.output.as_deref().filter(|o| !o.trim().is_empty()) {
        Some(output) => {
            lines.push("- output excerpt:".to_string());
            lines.push(snippet(output));
        }
        None => lines.push(format!("- output excerpt: {}", NO_OUTPUT)),
    }
    lines.push("Tell me if you want to re-run it or dig deeper.".to_string());
    lines.join("\n")
}

fn explain_response(query: &str, ctx: &SkillContext<'_>) -> String {
    let Some(latest) = ctx.latest_with_output() else {
        return format!(
            "You mentioned \"{}\". Tell me which command or output to analyze and I can explain it.",
            query
        );
    };

    format!(
        "You asked me to analyze \"{}\".\nOutput summary of the last command ({}):\n{}\n\n\
         Tell me which fields, metrics or anomalies you care about and I'll explain them based on this output.",
        query,
        latest.command,
        snippet(latest.output.as_deref().unwrap_or_default())
    )
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return NO_OUTPUT.to_string();
    }
    truncate_middle(text, SNIPPET_LIMIT)
}

fn extract_memory_value(text: &str) -> Option<String> {
    let caps = MEMORY_SIZE.captures(text)?;
    Some(format!("{} {}", &caps[1], &caps[2]))
}
