//! Natural-language requests in, shell commands (or answers) out.
//!
//! A query is first offered to the rule-based [`skills`]; if none claims it,
//! the [`planner`] asks a language model for a JSON plan. Commands pass the
//! [`safety`] gate before the [`executor`] runs them, the [`summarizer`]
//! condenses the output, and the [`history`] store remembers the exchange
//! for follow-up questions.

pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod llm;
pub mod planner;
pub mod safety;
pub mod skills;
pub mod summarizer;
pub mod types;
pub mod ui;

pub use error::{Error, Result};
