use crate::history::truncate_middle;
use crate::llm::LanguageModelProvider;
use crate::types::{ActionPlan, CommandResult};

pub const SUMMARY_INPUT_LIMIT: usize = 1600;

/// Best-effort one or two sentence recap of a command's output.
pub struct Summarizer<'a> {
    llm: &'a dyn LanguageModelProvider,
}

impl<'a> Summarizer<'a> {
    pub fn new(llm: &'a dyn LanguageModelProvider) -> Self {
        Self { llm }
    }

    /// `None` when no summary was asked for, there is nothing to summarize,
    /// or the model failed.
    pub fn summarize(&self, query: &str, plan: &ActionPlan, result: &CommandResult) -> Option<String> {
        if !plan.needs_summary {
            return None;
        }
        let output = summary_source(result)?;
        let prompt = build_summary_prompt(
            query,
            plan.command.as_deref().unwrap_or_default(),
            &truncate_middle(output, SUMMARY_INPUT_LIMIT),
        );

        match self.llm.generate(&prompt) {
            Ok(summary) => Some(summary.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::debug!("summary skipped: {}", e);
                None
            }
        }
    }
}

/// Trimmed stdout, or trimmed stderr when stdout is empty.
fn summary_source(result: &CommandResult) -> Option<&str> {
    [result.stdout.trim(), result.stderr.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
}

pub fn build_summary_prompt(query: &str, command: &str, output: &str) -> String {
    format!(
        "You are a terminal assistant summarizing a command result for the user.\n\
         Original request: {query}\n\
         Executed command: {command}\n\
         Command output:\n\
         {output}\n\n\
         Summarize in 1-2 concise sentences, highlight the key numbers or states, and say whether it succeeded."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use std::cell::RefCell;

    struct Recording {
        reply: Result<String, ()>,
        prompts: RefCell<Vec<String>>,
    }

    impl Recording {
        fn new(reply: Result<&str, ()>) -> Self {
            Self {
                reply: reply.map(String::from),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl LanguageModelProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone().map_err(|_| LlmError::RequestFailed {
                provider: "recording".into(),
                reason: "offline".into(),
            })
        }
    }

    fn result(stdout: &str, stderr: &str) -> CommandResult {
        CommandResult {
            returncode: 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn summarizes_stdout() {
        let llm = Recording::new(Ok("  Disk is 40% full.  "));
        let plan = ActionPlan::run_command("df -h", None);
        let summary = Summarizer::new(&llm).summarize("disk?", &plan, &result("/dev/sda1 40%", ""));
        assert_eq!(summary.as_deref(), Some("Disk is 40% full."));

        let prompts = llm.prompts.borrow();
        assert!(prompts[0].contains("Original request: disk?"));
        assert!(prompts[0].contains("Executed command: df -h"));
        assert!(prompts[0].contains("/dev/sda1 40%"));
    }

    #[test]
    fn falls_back_to_stderr() {
        let llm = Recording::new(Ok("It failed."));
        let plan = ActionPlan::run_command("ls nope", None);
        Summarizer::new(&llm).summarize("q", &plan, &result("  \n", "no such file"));
        assert!(llm.prompts.borrow()[0].contains("no such file"));
    }

    #[test]
    fn skips_when_not_needed_or_empty() {
        let llm = Recording::new(Ok("x"));
        let mut plan = ActionPlan::run_command("true", None);
        assert!(Summarizer::new(&llm).summarize("q", &plan, &result("", "")).is_none());
        plan.needs_summary = false;
        assert!(Summarizer::new(&llm).summarize("q", &plan, &result("out", "")).is_none());
        assert!(llm.prompts.borrow().is_empty());
    }

    #[test]
    fn model_failure_means_no_summary() {
        let llm = Recording::new(Err(()));
        let plan = ActionPlan::run_command("ls", None);
        assert!(Summarizer::new(&llm).summarize("q", &plan, &result("a", "")).is_none());
    }

    #[test]
    fn long_output_is_truncated_in_prompt() {
        let llm = Recording::new(Ok("ok"));
        let plan = ActionPlan::run_command("seq 1 100000", None);
        let output = "y".repeat(5000);
        Summarizer::new(&llm).summarize("q", &plan, &result(&output, ""));
        let prompt = &llm.prompts.borrow()[0];
        assert!(prompt.contains("\n...\n"));
        assert!(prompt.len() < 5000);
    }
}
