use clap::Parser;
use trae::commands::{cmd_history, cmd_query};
use trae::config::{Config, Overrides};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "trae",
    version,
    about = "Run Linux commands by asking in plain language",
    after_help = "Examples:\n  trae how much memory is in use\n  trae list the files in this directory\n  trae find all .log files"
)]
struct Cli {
    /// Natural-language request
    query: Vec<String>,

    /// Show the generated command without running it
    #[arg(long)]
    dry_run: bool,

    /// LLM API key (or set TRAE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// LLM provider: openai, anthropic, qwen/dashscope, local/ollama
    #[arg(long)]
    provider: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Number of past interactions to remember (default 50)
    #[arg(long)]
    context_window: Option<usize>,

    /// Print the remembered interactions and exit
    #[arg(long)]
    history: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TRAE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let query = cli.query.join(" ");
    if query.trim().is_empty() && !cli.history {
        let _ = <Cli as clap::CommandFactory>::command().print_help();
        return;
    }

    let overrides = Overrides {
        api_key: cli.api_key,
        provider: cli.provider,
        model: cli.model,
        context_window: cli.context_window,
    };
    let config = match Config::resolve(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("trae: {}", e);
            std::process::exit(1);
        }
    };

    let result = if cli.history {
        cmd_history(&config)
    } else {
        cmd_query(&query, &config, cli.dry_run)
    };

    match result {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("trae: {}", e);
            std::process::exit(1);
        }
    }
}
