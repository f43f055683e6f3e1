//! `ecotrack` - CLI for ecotracker
//!
//! This binary logs daily activities, shows history and trends, and
//! produces eco tips and PDF reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info};

use ecotracker::activity::{ActivityRecord, Category};
use ecotracker::calculator::{calculate, format_emissions, per_activity};
use ecotracker::cli::{
    Cli, Command, ConfigCommand, ExportCommand, HistoryCommand, InputArgs, LogCommand,
    OutputFormat, ReportCommand, TipCommand, TrendCommand,
};
use ecotracker::presets::InputPlan;
use ecotracker::report::{PdfExporter, ReportPayload};
use ecotracker::summary::format_summary;
use ecotracker::tips::TipRequest;
use ecotracker::{
    init_logging, CoefficientTable, Config, Error, HistoryRecord, HistoryStore, SaveOutcome,
    TipGenerator, TrendAggregator,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands that must work even when the configuration is broken
    match &cli.command {
        Command::Config(ConfigCommand::Path) => {
            println!(
                "{}",
                cli.config
                    .clone()
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
            return Ok(());
        }
        Command::Config(ConfigCommand::Validate { file }) => {
            return handle_validate(file.clone().or_else(|| cli.config.clone()));
        }
        _ => {}
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;
    let table = config.coefficient_table()?;
    let store = HistoryStore::new(config.history_path(), table.clone());
    debug!("History file: {}", store.path().display());

    // Execute the command
    match cli.command {
        Command::Log(cmd) => handle_log(&config, &table, &store, cmd).await,
        Command::History(cmd) => handle_history(&store, &cmd),
        Command::Trend(cmd) => handle_trend(&config, &store, &cmd),
        Command::Tip(cmd) => handle_tip(&config, &table, &store, cmd).await,
        Command::Report(cmd) => handle_report(&config, &table, &store, cmd).await,
        Command::Export(cmd) => handle_export(&store, &cmd),
        Command::Factors(cmd) => handle_factors(&table, cmd.json),
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve the day's inputs once: defaults, then preset, then `--set` values.
fn resolve_inputs(config: &Config, inputs: InputArgs) -> (InputPlan, ActivityRecord) {
    let plan = InputPlan::new(config.inputs.defaults.clone())
        .with_preset(inputs.preset)
        .with_overrides(inputs.values);
    let record = plan.resolve();
    (plan, record)
}

async fn handle_log(
    config: &Config,
    table: &CoefficientTable,
    store: &HistoryStore,
    cmd: LogCommand,
) -> anyhow::Result<()> {
    let date = cmd.date.unwrap_or_else(today);
    let (_, inputs) = resolve_inputs(config, cmd.inputs);

    let breakdown = match calculate(&inputs, table) {
        Ok(breakdown) => breakdown,
        Err(e @ Error::InvalidInput { .. }) => bail!("{e}; nothing was saved"),
        Err(e) => return Err(e.into()),
    };
    let activities = per_activity(&inputs, table)?;
    let day = HistoryRecord::new(date, inputs.clone(), breakdown.clone());

    let mut history = store.load()?;
    let previous =
        TrendAggregator::new(&history, config.trends.window_days).previous_before(date);

    let outcome = if cmd.dry_run {
        None
    } else if !inputs.has_meaningful_input() {
        info!("All quantities are zero, not saving {date}");
        None
    } else {
        Some(store.save(day.clone())?)
    };
    // Badges and streaks only see the day once it is on disk
    if outcome.is_some() {
        history.upsert(day);
    }

    let aggregator = TrendAggregator::new(&history, config.trends.window_days);
    let change = ecotracker::trends::percentage_change(
        previous.map(|p| p.total),
        breakdown.total(),
    );
    let badges = aggregator.badges(
        breakdown.total(),
        date,
        config.trends.low_impact_threshold_kg,
    );

    let tip = if cmd.tip {
        let request = TipRequest::new(date, inputs.clone(), breakdown.clone());
        Some(TipGenerator::from_config(config).generate(&request).await)
    } else {
        None
    };

    if cmd.json {
        let output = json!({
            "date": date,
            "inputs": inputs,
            "breakdown": breakdown,
            "per_activity": activities,
            "change": change,
            "badges": badges,
            "saved": outcome.is_some(),
            "replaced": outcome == Some(SaveOutcome::Replaced),
            "tip": tip,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{date}  {}", format_summary(&inputs));
    println!();
    for (category, kg) in breakdown.iter() {
        println!("  {} {:<10} {:>16}", category.icon(), category, format_emissions(kg));
    }
    println!("  {:<13} {:>16}", "Total", format_emissions(breakdown.total()));
    println!("  {:<13} {:>16}", "vs previous", change.to_string());
    if !activities.is_empty() {
        println!();
        for emission in &activities {
            println!(
                "  {:<22} {:>10.2} {:<4} {:>14}",
                emission.activity.label(),
                emission.quantity,
                emission.activity.unit(),
                format_emissions(emission.kg_co2e)
            );
        }
    }
    if !badges.is_empty() {
        println!();
        for badge in &badges {
            println!("  {badge}");
        }
    }
    if let Some(tip) = &tip {
        println!();
        println!("Tip ({}): {}", tip.source, tip.text);
    }
    println!();
    match outcome {
        Some(SaveOutcome::Inserted) => println!("Saved {date} to {}", store.path().display()),
        Some(SaveOutcome::Replaced) => println!("Replaced existing entry for {date}"),
        None if cmd.dry_run => println!("Dry run: nothing saved"),
        None => println!("Nothing to save: every quantity is zero"),
    }
    Ok(())
}

fn handle_history(store: &HistoryStore, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let history = store.load()?;
    let records = history.records();
    let start = cmd
        .limit
        .map_or(0, |limit| records.len().saturating_sub(limit));
    let records = &records[start..];

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for record in records {
                println!(
                    "{} {:.2}",
                    record.date.format("%Y-%m-%d"),
                    record.total()
                );
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No history yet. Log a day with `ecotrack log`.");
                return Ok(());
            }
            println!(
                "{:<10}  {:>10}  {:>10}  {:>10}  {:>10}",
                "Date", "Energy", "Transport", "Meals", "Total"
            );
            println!("{}", "-".repeat(58));
            for record in records {
                println!(
                    "{:<10}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}",
                    record.date.format("%Y-%m-%d"),
                    record.breakdown.category(Category::Energy),
                    record.breakdown.category(Category::Transport),
                    record.breakdown.category(Category::Meals),
                    record.total()
                );
            }
            println!();
            println!("{} record(s), kg CO₂e", records.len());
        }
    }
    Ok(())
}

fn handle_trend(config: &Config, store: &HistoryStore, cmd: &TrendCommand) -> anyhow::Result<()> {
    let history = store.load()?;
    let date = cmd.date.unwrap_or_else(today);
    let aggregator = TrendAggregator::new(&history, config.trends.window_days);
    let report = aggregator.report(date);
    let deltas: Vec<_> = Category::ALL
        .iter()
        .filter_map(|category| {
            aggregator
                .period_delta(*category, date)
                .map(|delta| (*category, delta))
        })
        .collect();
    let badges = report.latest.map_or_else(Vec::new, |latest| {
        aggregator.badges(latest.total, date, config.trends.low_impact_threshold_kg)
    });

    if cmd.json {
        let output = json!({
            "report": report,
            "weekly": deltas.iter().map(|(c, d)| (c.key(), d)).collect::<std::collections::BTreeMap<_, _>>(),
            "badges": badges,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(latest) = report.latest else {
        println!("No data up to {date}.");
        return Ok(());
    };

    println!("Trends as of {date}");
    println!();
    println!("  Latest      {}  {}", latest.date, format_emissions(latest.total));
    match report.previous {
        Some(previous) => println!(
            "  Previous    {}  {}",
            previous.date,
            format_emissions(previous.total)
        ),
        None => println!("  Previous    N/A"),
    }
    println!("  Change      {}", report.change);
    println!("  Streak      {} day(s)", report.streak_days);

    println!();
    println!("Last {} record(s):", report.window.len());
    for point in &report.window {
        println!("  {}  {:>10.2}", point.date, point.total);
    }

    if let Some(averages) = &report.category_averages {
        println!();
        println!("Window averages:");
        for (category, average) in averages {
            println!("  {:<10} {}", category, format_emissions(*average));
        }
    }

    if !deltas.is_empty() {
        println!();
        println!("Last 7 records vs the 7 before:");
        for (category, delta) in &deltas {
            println!(
                "  {:<10} {:>10.2} vs {:>10.2}  ({})",
                category, delta.last_total, delta.previous_total, delta.change
            );
        }
    }

    if !badges.is_empty() {
        println!();
        for badge in &badges {
            println!("  {badge}");
        }
    }
    Ok(())
}

async fn handle_tip(
    config: &Config,
    table: &CoefficientTable,
    store: &HistoryStore,
    cmd: TipCommand,
) -> anyhow::Result<()> {
    let date = cmd.date.unwrap_or_else(today);
    let (plan, inputs) = resolve_inputs(config, cmd.inputs);

    let request = if plan.has_user_input() {
        let breakdown = calculate(&inputs, table)?;
        TipRequest::new(date, inputs, breakdown)
    } else {
        let history = store.load()?;
        let Some(saved) = history.get(date) else {
            bail!("no saved record for {date}; pass --preset or --set to describe the day");
        };
        TipRequest::new(date, saved.inputs.clone(), saved.breakdown.clone())
    };

    let tip = TipGenerator::from_config(config).generate(&request).await;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&tip)?);
    } else {
        println!("{}", tip.text);
        println!();
        println!("Source: {}", tip.source);
    }
    Ok(())
}

async fn handle_report(
    config: &Config,
    table: &CoefficientTable,
    store: &HistoryStore,
    cmd: ReportCommand,
) -> anyhow::Result<()> {
    let history = store.load()?;
    let day = match cmd.date {
        Some(date) => history
            .get(date)
            .with_context(|| format!("no saved record for {date}"))?,
        None => history
            .latest()
            .context("history is empty; log a day first")?,
    };

    let mut payload =
        ReportPayload::assemble(&config.report, day, &history, table, config.trends.window_days)?;
    if let Some(title) = cmd.title {
        payload = payload.with_title(title);
    }
    if !cmd.no_tip {
        let request = TipRequest::new(day.date, day.inputs.clone(), day.breakdown.clone());
        let tip = TipGenerator::from_config(config).generate(&request).await;
        payload = payload.with_tip(Some(tip));
    }

    let bytes = PdfExporter::new().render(&payload)?;
    write_file(&cmd.output, &bytes)?;
    println!("Wrote {} ({} bytes)", cmd.output.display(), bytes.len());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn handle_export(store: &HistoryStore, cmd: &ExportCommand) -> anyhow::Result<()> {
    match &cmd.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let count = store.export_to(BufWriter::new(file))?;
            println!("Exported {count} record(s) to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            store.export_to(&mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn handle_factors(table: &CoefficientTable, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    for category in Category::ALL {
        println!("[{category}]");
        for activity in category.activities() {
            let factor = table.factor(activity).unwrap_or_default();
            println!(
                "  {:<20} {:>9.4} kg CO₂e / {}",
                activity.key(),
                factor,
                activity.unit()
            );
        }
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommand::Show { json: false } => {
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Storage]");
            println!("  History path:       {}", config.history_path().display());
            println!();
            println!("[Factors]");
            println!("  Overrides:          {}", config.factors.len());
            println!("  Input defaults:     {}", config.inputs.defaults.len());
            println!();
            println!("[Trends]");
            println!("  Window (records):   {}", config.trends.window_days);
            println!(
                "  Low impact below:   {}",
                format_emissions(config.trends.low_impact_threshold_kg)
            );
            println!();
            println!("[Tips]");
            println!("  Enabled:            {}", config.tips.enabled);
            println!("  Model:              {}", config.tips.model);
            println!(
                "  API key:            {}",
                if config.api_key().is_some() {
                    "set"
                } else {
                    "not set"
                }
            );
            println!();
            println!("[Report]");
            println!("  Title:              {}", config.report.title);
            println!("  Primary color:      {}", config.report.primary_color);
            println!(
                "  Logo:               {}",
                config
                    .report
                    .logo_path
                    .as_ref()
                    .map_or_else(|| "badge".to_string(), |p| p.display().to_string())
            );
        }
        // Handled before the configuration is loaded
        ConfigCommand::Path | ConfigCommand::Validate { .. } => {}
    }
    Ok(())
}
