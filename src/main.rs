//! churnkit: customer churn prediction CLI
//!
//! `prepare` cleans and transforms a raw dataset, `train` fits and evaluates a
//! model, `predict` scores one record and `serve` answers records from stdin.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use churnkit::cli::{confirm_rebuild, Cli, Commands};
use churnkit::config::PipelineConfig;
use churnkit::inference::{ChurnPredictor, RawRecord};
use churnkit::pipeline::{ArtifactLayout, PreparedData};
use churnkit::report::{display_evaluation, display_prepare_summary};
use churnkit::service::PredictionService;
use churnkit::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_info, print_step_header, print_step_time, print_success, print_warning,
};
use churnkit::workflow;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let layout = ArtifactLayout::new(&cli.artifacts);

    match &cli.command {
        Commands::Prepare { input, force, .. } => {
            run_prepare(&cli, &config, &layout, input, *force)
        }
        Commands::Train { input, force, .. } => {
            run_train(&cli, &config, &layout, input.as_deref(), *force)
        }
        Commands::Predict { record } => run_predict(&layout, record),
        Commands::Serve { timeout_ms } => run_serve(&layout, Duration::from_millis(*timeout_ms)),
    }
}

/// Decide whether existing prepared data should be rebuilt
fn should_rebuild(layout: &ArtifactLayout, force: bool, no_confirm: bool) -> Result<bool> {
    if force || !layout.has_prepared_data() {
        return Ok(true);
    }
    if no_confirm {
        return Ok(false);
    }
    confirm_rebuild(layout.root())
}

fn prepare_step(
    config: &PipelineConfig,
    layout: &ArtifactLayout,
    input: Option<&Path>,
    rebuild: bool,
) -> Result<PreparedData> {
    let step_start = Instant::now();
    let spinner = create_spinner("Preparing data...");

    let prepared = match input {
        Some(input) => workflow::prepare(config, input, layout, rebuild),
        None if !rebuild => churnkit::pipeline::DataPipeline::new(config).load_cached(layout),
        None => Err(anyhow::anyhow!(
            "No prepared data in {}. Use -i/--input to specify a raw dataset.",
            layout.root().display()
        )),
    };
    let prepared = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            finish_with_warning(&spinner, "Data preparation failed");
            return Err(e);
        }
    };

    if prepared.from_cache {
        finish_with_success(&spinner, "Reusing prepared data");
        print_info(&format!(
            "Prepared {} (version {})",
            prepared.manifest.created_at, prepared.manifest.version
        ));
        if !prepared.manifest.split_matches(&config.split) {
            print_warning(&format!(
                "Cached split was drawn with seed {}; use --force to resplit with seed {}",
                prepared.manifest.split_seed, config.split.seed
            ));
        }
    } else {
        finish_with_success(&spinner, "Data prepared");
    }
    println!(
        "      Train: {} rows, Test: {} rows, Features: {}",
        style(prepared.split.x_train.height()).yellow().bold(),
        style(prepared.split.x_test.height()).yellow().bold(),
        style(prepared.split.x_train.width()).yellow().bold()
    );
    if let Some(stats) = &prepared.stats {
        display_prepare_summary(stats);
    }
    print_step_time(step_start.elapsed());
    Ok(prepared)
}

fn run_prepare(
    cli: &Cli,
    config: &PipelineConfig,
    layout: &ArtifactLayout,
    input: &Path,
    force: bool,
) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        Some(input),
        layout.root(),
        &config.model.kind.to_string(),
        config.split.seed,
    );

    let rebuild = should_rebuild(layout, force, cli.no_confirm)?;
    print_step_header(1, "Prepare Data");
    prepare_step(config, layout, Some(input), rebuild)?;

    print_completion("Preparation complete!");
    Ok(())
}

fn run_train(
    cli: &Cli,
    config: &PipelineConfig,
    layout: &ArtifactLayout,
    input: Option<&Path>,
    force: bool,
) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        input,
        layout.root(),
        &config.model.kind.to_string(),
        config.model.random_state,
    );

    let rebuild = if input.is_some() {
        should_rebuild(layout, force, cli.no_confirm)?
    } else {
        force || !layout.has_prepared_data()
    };

    print_step_header(1, "Prepare Data");
    let prepared = prepare_step(config, layout, input, rebuild)?;

    print_step_header(2, "Train & Evaluate");
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Training {} model...", config.model.kind));
    let outcome = workflow::train(config, &prepared, layout)?;
    finish_with_success(&spinner, "Model trained");

    display_evaluation(&outcome.report, outcome.train_accuracy);
    println!();
    print_success(&format!("Model saved to {}", layout.model_path().display()));
    print_step_time(step_start.elapsed());

    print_completion("Training complete!");
    Ok(())
}

fn parse_record(text: &str) -> Result<RawRecord> {
    serde_json::from_str(text).context("Record must be a flat JSON object")
}

fn run_predict(layout: &ArtifactLayout, record: &str) -> Result<()> {
    let text = match record.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read record file: {}", path))?,
        None => record.to_string(),
    };
    let record = parse_record(&text)?;

    let predictor = ChurnPredictor::load(layout).with_context(|| {
        format!("Failed to load artifacts from {}", layout.root().display())
    })?;
    let prediction = predictor.predict(&record)?;
    println!("{}", serde_json::to_string(&prediction)?);
    Ok(())
}

fn run_serve(layout: &ArtifactLayout, timeout: Duration) -> Result<()> {
    let service = PredictionService::start(layout, timeout).with_context(|| {
        format!("Failed to load artifacts from {}", layout.root().display())
    })?;
    print_warning("Reading one JSON record per line from stdin; Ctrl-D to stop");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_record(&line) {
            Ok(record) => match service.predict_with_timeout(record) {
                Ok(prediction) => serde_json::to_value(&prediction)?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            Err(e) => serde_json::json!({ "error": format!("{:#}", e) }),
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}
