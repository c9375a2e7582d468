use crate::config::Config;
use crate::error::{Error, PlanError};
use crate::executor::Executor;
use crate::history::ContextStore;
use crate::llm::{create_provider, LanguageModelProvider};
use crate::planner::Planner;
use crate::safety::SafetyGate;
use crate::skills::SkillManager;
use crate::summarizer::Summarizer;
use crate::types::{ActionPlan, Intent};
use crate::ui::{self, Confirmation};
use std::io::{self, IsTerminal, Write};

pub const EXIT_INTERRUPTED: i32 = 130;

const CHAT_MARKER: &str = "[chat]";
const CLARIFICATION_MARKER: &str = "[clarification]";
const DRY_RUN_MARKER: &str = "[dry-run]";
const NO_REPLY: &str = "(no reply available)";
const NEED_MORE_INFO: &str = "I need more information before I can continue.";

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    Clarified,
    DryRun,
    Cancelled,
    Interrupted,
    Executed(i32),
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Replied | Outcome::Clarified | Outcome::DryRun | Outcome::Cancelled => 0,
            Outcome::Interrupted => EXIT_INTERRUPTED,
            Outcome::Executed(code) => code,
        }
    }
}

/// One query's trip through plan, gate, execute, summarize and record.
pub struct Session<'a> {
    planner: Planner<'a>,
    summarizer: Summarizer<'a>,
    store: &'a ContextStore,
    executor: Executor,
    gate: SafetyGate,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a ContextStore, llm: &'a dyn LanguageModelProvider, executor: Executor) -> Self {
        Self {
            planner: Planner::new(SkillManager::default(), store, llm),
            summarizer: Summarizer::new(llm),
            store,
            executor,
            gate: SafetyGate::new(),
        }
    }

    /// `confirm` is consulted only for commands the safety gate flags.
    pub fn handle(
        &self,
        query: &str,
        dry_run: bool,
        confirm: &mut dyn FnMut(&str) -> Confirmation,
    ) -> Result<Outcome, Error> {
        let plan = self.plan(query).ok_or(Error::NoPlan)?;

        match &plan.intent {
            Intent::ChatReply => {
                let reply = plan
                    .response
                    .as_deref()
                    .or(plan.explanation.as_deref())
                    .unwrap_or(NO_REPLY);
                ui::print_message(reply);
                self.store.add_entry(query, CHAT_MARKER, Some(reply));
                Ok(Outcome::Replied)
            }
            Intent::AskClarification => {
                let message = plan.explanation.as_deref().unwrap_or(NEED_MORE_INFO);
                ui::print_message(message);
                self.store.add_entry(query, CLARIFICATION_MARKER, Some(message));
                Ok(Outcome::Clarified)
            }
            Intent::RunCommand => self.run(query, &plan, dry_run, confirm),
            Intent::Other(name) => Err(Error::UnsupportedIntent(name.clone())),
        }
    }

    fn plan(&self, query: &str) -> Option<ActionPlan> {
        let interactive = io::stderr().is_terminal();
        if interactive {
            eprint!("thinking...");
            io::stderr().flush().ok();
        }
        let plan = self.planner.plan(query);
        if interactive {
            eprint!("\r           \r");
            io::stderr().flush().ok();
        }
        plan
    }

    fn run(
        &self,
        query: &str,
        plan: &ActionPlan,
        dry_run: bool,
        confirm: &mut dyn FnMut(&str) -> Confirmation,
    ) -> Result<Outcome, Error> {
        let command = plan
            .command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(PlanError::MissingCommand)?;

        ui::print_plan(plan);

        if dry_run {
            self.store.add_entry(query, command, Some(DRY_RUN_MARKER));
            ui::print_message("[dry run - command not executed]");
            return Ok(Outcome::DryRun);
        }

        if let Some(reason) = self.gate.check(command) {
            match confirm(reason) {
                Confirmation::Proceed => {}
                Confirmation::Decline => {
                    println!("cancelled.");
                    return Ok(Outcome::Cancelled);
                }
                Confirmation::Interrupted => return Ok(Outcome::Interrupted),
            }
        }

        println!();
        let result = self.executor.execute(command);
        ui::print_output(&result);

        if !result.success() {
            let log = [result.stderr.as_str(), result.stdout.as_str()]
                .into_iter()
                .find(|s| !s.trim().is_empty());
            self.store.add_entry(query, command, log);
            return Ok(Outcome::Executed(result.returncode));
        }

        let summary = self.summarizer.summarize(query, plan, &result);
        if let Some(summary) = &summary {
            ui::print_summary(summary);
        }

        let stdout = Some(result.stdout.as_str()).filter(|s| !s.trim().is_empty());
        let log = match (summary, stdout) {
            (Some(summary), Some(stdout)) => Some(format!("{}\n\n{}", summary, stdout)),
            (Some(summary), None) => Some(summary),
            (None, stdout) => stdout.map(String::from),
        };
        self.store.add_entry(query, command, log.as_deref());
        Ok(Outcome::Executed(0))
    }
}

pub fn cmd_query(query: &str, config: &Config, dry_run: bool) -> Result<Outcome, Error> {
    let llm = create_provider(&config.llm)?;
    let store = ContextStore::from_config(&config.context);
    let session = Session::new(
        &store,
        llm.as_ref(),
        Executor::new(config.execution.command_timeout()),
    );
    session.handle(query, dry_run, &mut ui::confirm_dangerous)
}

pub fn cmd_history(config: &Config) -> Result<Outcome, Error> {
    let store = ContextStore::from_config(&config.context);
    ui::print_history(&store.load());
    Ok(Outcome::Replied)
}
