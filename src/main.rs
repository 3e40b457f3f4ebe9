use ecotone::prelude::*;
use ecotone::compose;
use ecotone::metrics::logger::{CatalogueLogger, OutputKeysLogger};
use ecotone::resolve;
use ecotone::validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a config file, apply overrides, and print the resolved document
    Resolve {
        #[arg(short, long, default_value = "configs/default.yaml")]
        config: PathBuf,
        /// Overrides in KEY=VALUE form, dotted keys allowed
        #[arg(short = 'o', long = "override")]
        overrides: Vec<String>,
        /// Write the result to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Emit JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Check a resolved config against the structural invariants
    Validate {
        #[arg(short, long, default_value = "configs/default.yaml")]
        config: PathBuf,
        #[arg(short = 'o', long = "override")]
        overrides: Vec<String>,
    },

    /// Print the derived eval/video schedule for a config
    Schedule {
        #[arg(short, long, default_value = "configs/default.yaml")]
        config: PathBuf,
        #[arg(short = 'o', long = "override")]
        overrides: Vec<String>,
        /// Stop after this many scheduled timesteps
        #[arg(short, long, default_value_t = 32)]
        limit: usize,
    },

    /// Print the measure catalogue and aggregator output keys
    Catalogue {
        #[arg(short, long, default_value = "configs/default.yaml")]
        config: PathBuf,
        /// Write the catalogue as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the aggregator output keys as CSV
        #[arg(long)]
        keys_csv: Option<PathBuf>,
    },

    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Resolve { config, overrides, output, json } => {
            resolve_command(&config, &overrides, output.as_deref(), json)?;
        }

        Commands::Validate { config, overrides } => {
            validate_command(&config, &overrides)?;
        }

        Commands::Schedule { config, overrides, limit } => {
            schedule_command(&config, &overrides, limit)?;
        }

        Commands::Catalogue { config, csv, keys_csv } => {
            catalogue_command(&config, csv.as_deref(), keys_csv.as_deref())?;
        }

        Commands::List => {
            println!("\nAvailable Aggregator Classes");

            let registry = AggregatorRegistry::global();
            for name in registry.list() {
                if let Some(class) = registry.get(&name) {
                    println!("  - {} ({})", name, class.scope());
                }
            }

            println!("\nUsage: cargo run -- validate --config <file>");
            println!("Example: cargo run -- resolve -o n_timesteps=500\n");
        }
    }

    Ok(())
}

fn resolve_command(
    config: &std::path::Path,
    overrides: &[String],
    output: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    let mut doc = compose::compose(config)?;
    for spec in overrides {
        compose::apply_override(&mut doc, spec)?;
    }
    let resolved = resolve::resolve_document(&doc)?;

    let rendered = if json {
        serde_json::to_string_pretty(&resolved)?
    } else {
        serde_yaml::to_string(&resolved)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("Resolved config written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn validate_command(config: &std::path::Path, overrides: &[String]) -> Result<()> {
    let experiment = ExperimentConfig::load(config, overrides)?;
    let report = validate::validate_experiment(&experiment);

    print!("{report}");
    if report.is_ok() {
        info!(
            "Config is valid ({} warning(s))",
            report.warnings.len()
        );
        Ok(())
    } else {
        anyhow::bail!("{} validation error(s)", report.errors.len())
    }
}

fn schedule_command(config: &std::path::Path, overrides: &[String], limit: usize) -> Result<()> {
    let experiment = ExperimentConfig::load(config, overrides)?;
    let plan = SchedulePlan::from_config(&experiment)?;

    info!("Evals: {} (every {} steps)", plan.n_evals(), plan.period_eval);
    if plan.do_video {
        info!(
            "Videos: {} ({} frames each)",
            plan.n_videos(),
            plan.frames_per_video()
        );
    }

    for (t, events) in plan.iter().take(limit) {
        let names: Vec<String> = events.iter().map(|e| format!("{e:?}")).collect();
        println!("t={t:>8}  {}", names.join(", "));
    }

    Ok(())
}

fn catalogue_command(
    config: &std::path::Path,
    csv: Option<&std::path::Path>,
    keys_csv: Option<&std::path::Path>,
) -> Result<()> {
    let experiment = ExperimentConfig::load(config, &[])?;
    let metrics = &experiment.env.metrics;

    if let Some(path) = csv {
        let mut logger = CatalogueLogger::new(path)?;
        logger.log(&metrics.measures)?;
        info!("Catalogue written to: {}", path.display());
    }
    if let Some(path) = keys_csv {
        let mut logger = OutputKeysLogger::new(path)?;
        logger.log(metrics)?;
        info!("Output keys written to: {}", path.display());
    }
    if csv.is_some() || keys_csv.is_some() {
        return Ok(());
    }

    for (category, names) in metrics.measures.categories() {
        println!("\n{category} ({})", names.len());
        for name in names {
            println!("  - {name}");
        }
    }

    let registry = AggregatorRegistry::global();
    println!("\noutput keys");
    for spec in metrics
        .aggregators_lifespan
        .iter()
        .chain(&metrics.aggregators_population)
    {
        if let Some(class) = registry.resolve(&spec.class_string) {
            for key in class.output_keys(&spec.config) {
                println!("  - {key}");
            }
        }
    }
    println!();

    Ok(())
}
