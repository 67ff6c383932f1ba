use clap::Parser;
use tracing::debug;

use dashmetrics::adapter::inbound::cli::command::{Cli, ColorChoice, Commands, TimeArgs};
use dashmetrics::adapter::inbound::cli::context::CommandContext;
use dashmetrics::adapter::inbound::cli::output::{self, OutputConfig};
use dashmetrics::adapter::inbound::cli::{expression, metric, range};
use dashmetrics::error::Result;
use dashmetrics::infrastructure::config::settings::Config;

fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    if let Err(e) = run(cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(&cli.config)?;
    match cli.verbose {
        0 if cli.quiet => config.logging.level = "error".into(),
        0 => {}
        1 => config.logging.level = "info".into(),
        _ => config.logging.level = "debug".into(),
    }
    config.init_logging();
    debug!(config = %cli.config.display(), "Loaded configuration");

    let time = match &cli.command {
        Commands::Range(args) => args.time.clone(),
        Commands::Expression(args) => args.time.clone(),
        Commands::Value(args) => args.time.clone(),
        Commands::Trend(args) => args.time.clone(),
        Commands::Ranges | Commands::Partition(_) => TimeArgs::default(),
    };
    let ctx = CommandContext::new(config, &time)?;

    match &cli.command {
        Commands::Range(args) => range::execute(&ctx, args),
        Commands::Ranges => {
            range::execute_list(&ctx);
            Ok(())
        }
        Commands::Expression(args) => expression::execute(&ctx, args),
        Commands::Value(args) => metric::execute_value(&ctx, args),
        Commands::Trend(args) => metric::execute_trend(&ctx, args),
        Commands::Partition(args) => metric::execute_partition(&ctx, args),
    }
}
