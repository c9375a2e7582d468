use crate::types::{ActionPlan, CommandResult, HistoryEntry};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal,
};
use std::io::{self, IsTerminal, Write};

/// Answer to the dangerous-command prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Decline,
    Interrupted,
}

pub fn print_plan(plan: &ActionPlan) {
    if let Some(explanation) = plan.explanation.as_deref().filter(|e| !e.is_empty()) {
        println!();
        println!("plan: {}", explanation);
    }
    if let Some(command) = &plan.command {
        println!();
        println!("  {}", command);
    }
}

pub fn print_message(message: &str) {
    println!();
    println!("{}", message);
}

pub fn print_output(result: &CommandResult) {
    if result.success() {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
            if !result.stdout.ends_with('\n') {
                println!();
            }
        }
    } else if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
        if !result.stderr.ends_with('\n') {
            eprintln!();
        }
    }
}

pub fn print_summary(summary: &str) {
    println!();
    println!("summary: {}", summary);
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("no history yet.");
        return;
    }

    println!("recent interactions:");
    println!();
    for entry in entries {
        println!("> {}", entry.query);
        println!("    {}", entry.command);
        if let Some(output) = &entry.output {
            for line in output.lines().take(3) {
                println!("    | {}", line);
            }
        }
        println!();
    }
}

/// Asks y/N for a dangerous command. Anything but `y` declines.
pub fn confirm_dangerous(reason: &str) -> Confirmation {
    eprintln!();
    eprintln!("warning: this command may be destructive ({})", reason);
    eprint!("run it anyway? [y/N] ");
    io::stderr().flush().ok();

    let answer = if io::stdin().is_terminal() {
        read_key()
    } else {
        read_line()
    };
    eprintln!();
    answer
}

fn read_key() -> Confirmation {
    if terminal::enable_raw_mode().is_err() {
        return read_line();
    }
    let answer = loop {
        match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => match k.code {
                KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Confirmation::Interrupted
                }
                KeyCode::Char('y') | KeyCode::Char('Y') => break Confirmation::Proceed,
                _ => break Confirmation::Decline,
            },
            Ok(_) => {}
            Err(_) => break Confirmation::Decline,
        }
    };
    terminal::disable_raw_mode().ok();
    answer
}

fn read_line() -> Confirmation {
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(_) if input.trim().eq_ignore_ascii_case("y") => Confirmation::Proceed,
        _ => Confirmation::Decline,
    }
}
