use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use tally_core::config::Config;
use tally_core::providers::factory::PROVIDERS;

const BANNER: &str = r"
    -------------------------------------

     _____  _    _     _  __   __
    |_   _|/ \  | |   | | \ \ / /
      | | / _ \ | |   | |  \ V /
      | |/ ___ \| |___| |___| |
      |_/_/   \_\_____|_____|_|

    -------------------------------------
";

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your provider")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].to_string())
}

fn setup_api_key(provider: &str) -> Result<String> {
    if provider == "ollama" {
        println!("  {} Ollama runs locally, no key needed", style("✓").green());
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {provider} API key"))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn models_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "ollama" => &["llama3.1", "qwen2.5", "mistral"],
        "openrouter" => &[
            "openai/gpt-4o",
            "anthropic/claude-3.5-sonnet",
            "meta-llama/llama-3.1-70b-instruct",
        ],
        _ => &["gpt-4o", "gpt-4o-mini", "gpt-4.1"],
    }
}

fn setup_model(provider: &str) -> Result<String> {
    let models = models_for(provider);

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

fn setup_step_budget(default: usize) -> Result<usize> {
    Input::new()
        .with_prompt("Step budget per run")
        .default(default)
        .validate_with(|n: &usize| {
            if *n > 0 {
                Ok(())
            } else {
                Err("the budget must be at least 1")
            }
        })
        .interact_text()
        .context("Failed to read step budget")
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to tally!").white().bold());
    println!(
        "  {}",
        style("This wizard picks a model backend and a step budget.").dim()
    );
    println!();

    let defaults = Config::default();

    print_step(1, 4, "Provider");
    let provider = setup_provider()?;

    print_step(2, 4, "API Key");
    let api_key = setup_api_key(&provider)?;

    print_step(3, 4, "Model");
    let model = setup_model(&provider)?;

    print_step(4, 4, "Step Budget");
    let step_budget = setup_step_budget(defaults.step_budget)?;

    let config = Config {
        provider: Some(provider),
        api_key,
        model,
        step_budget,
        ..defaults
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(tally_core::config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("tally chat").cyan().bold()
    );
    println!();

    Ok(config)
}
