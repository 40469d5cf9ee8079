use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::io::Write;
use std::sync::Arc;
use interrupt::Interrupts;
use tally_core::agent::{AgentLoop, ContextBuilder, RunOutcome, Termination, ToolRegistry};
use tally_core::traits::{Message, Role};
use tally_core::{config, providers, tools};
use tracing_subscriber::EnvFilter;
mod interrupt;
mod onboard;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "tally - bounded ReAct agent for invoice bookkeeping", long_about = None)]
struct Cli {
    /// Log every phase and routing decision to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Onboard,
    /// Answer a single message
    Run {
        #[arg(short, long)]
        message: String,
        /// Override the configured step budget
        #[arg(short, long)]
        budget: Option<usize>,
        /// Print the whole conversation, not just the answer
        #[arg(long)]
        transcript: bool,
    },
    /// Interactive session, one fresh run per line
    Chat,
    /// List the available tools
    Tools,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tally=debug" } else { "tally=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_agent(config: &config::Config, registry: ToolRegistry) -> Result<AgentLoop> {
    let provider = providers::create_provider(config)?;
    let agent_loop = AgentLoop::new(
        Arc::from(provider),
        ContextBuilder::new(config.system_prompt.clone()),
        Arc::new(registry),
    )
    .with_plan(config.phases.clone())
    .with_step_budget(config.step_budget)
    .with_tool_timeout(config.tool_timeout());
    tracing::debug!(
        model = %config.model,
        step_budget = config.step_budget,
        phases = config.phases.before_action.len() + config.phases.after_tools.len(),
        "agent ready"
    );
    Ok(agent_loop)
}

fn print_message(message: &Message) {
    let label = match (&message.role, &message.phase) {
        (Role::Agent, Some(phase)) => format!("agent/{phase}"),
        (role, _) => role.to_string(),
    };
    let advisory = message.role == Role::Agent
        && message
            .phase
            .as_deref()
            .is_some_and(|p| p != tally_core::agent::phase::MODEL_CALL);

    let body = if message.has_tool_requests() {
        let calls: Vec<String> = message
            .tool_requests
            .iter()
            .map(|r| format!("{}({})", r.name, r.arguments))
            .collect();
        format!("{}\n  -> {}", message.content, calls.join("\n  -> "))
    } else {
        message.content.clone()
    };

    if advisory {
        println!("{} {}", style(format!("[{label}]")).dim(), style(body).dim());
    } else if message.is_error {
        println!("{} {}", style(format!("[{label}]")).red(), body);
    } else {
        println!("{} {}", style(format!("[{label}]")).cyan().bold(), body);
    }
}

fn print_outcome(outcome: &RunOutcome, transcript: bool) {
    if transcript {
        for message in outcome.messages() {
            print_message(message);
        }
        println!();
    }
    match outcome.termination {
        Termination::Cancelled => eprintln!("{} Run cancelled", style("!").yellow()),
        Termination::BudgetExhausted if transcript => {
            eprintln!("{} Step budget exhausted", style("!").yellow())
        }
        _ => {}
    }
    println!("{}", outcome.final_text());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Tools => {
            let registry = tools::default_registry(tools::LedgerStore::default());
            for spec in registry.specs() {
                println!("{}  {}", style(&spec.name).cyan().bold(), spec.description);
            }
        }
        Commands::Run {
            message,
            budget,
            transcript,
        } => {
            let config = config::load_config()?;
            let registry = tools::default_registry(tools::LedgerStore::seeded()?);
            let agent_loop = build_agent(&config, registry)?;

            let budget = budget.unwrap_or(config.step_budget);
            match Interrupts::install().run(&agent_loop, &message, budget).await {
                Ok(outcome) => print_outcome(&outcome, transcript),
                Err(e) => {
                    eprintln!("❌ Error: {}", e);
                    anyhow::bail!("Agent run failed: {}", e);
                }
            }
        }
        Commands::Chat => {
            let config = config::load_config()?;
            // One ledger for the session so payment updates persist across lines.
            let registry = tools::default_registry(tools::LedgerStore::seeded()?);
            let agent_loop = build_agent(&config, registry)?;
            let interrupts = Interrupts::install();

            println!("{}", style("tally").cyan().bold());
            println!("Type your message (Ctrl+D to exit):\n");
            use std::io::{self, BufRead};
            let stdin = io::stdin();

            loop {
                print!("> ");
                let _ = io::stdout().flush();

                let mut input = String::new();
                match stdin.lock().read_line(&mut input) {
                    Ok(0) | Err(_) => {
                        println!("\n👋 Goodbye!");
                        break;
                    }
                    Ok(_) => {
                        let input = input.trim();
                        if input.is_empty() {
                            continue;
                        }

                        println!("\n🤔 Processing...\n");
                        match interrupts.run(&agent_loop, input, config.step_budget).await {
                            Ok(outcome) => print_outcome(&outcome, false),
                            Err(e) => eprintln!("❌ Error: {}", e),
                        }
                        println!();
                    }
                }
            }
        }
    }

    Ok(())
}
