//! medexam CLI - Medical examination result sheets
//!
//! Exports campaign result workbooks and import templates, imports filled
//! workbooks back into the JSON data file, and reports per-column tallies.

mod config;
mod data;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medexam_core::{
    resolve_columns, tally_results, CampaignId, CatalogReader, DynamicColumn, HeaderColumnMeta,
    MemoryStore, ResultKey, ResultStore, RosterFilter,
};
use medexam_xlsx::import_workbook;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "medexam")]
#[command(author, version, about = "Medical examination result sheets", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON data file with catalog, rosters and results
    #[arg(long, env = "MEDEXAM_DATA", default_value = "medexam.json", global = true)]
    data: PathBuf,

    /// Config file (defaults to ./medexam.toml when present)
    #[arg(long, env = "MEDEXAM_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dynamic columns of a campaign
    Columns {
        /// Campaign id
        #[arg(short, long)]
        campaign: CampaignId,

        /// Print columns as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a campaign result workbook
    Export {
        /// Campaign id
        #[arg(short, long)]
        campaign: CampaignId,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write the header-only import template
        #[arg(long)]
        template: bool,

        /// Only students of this school
        #[arg(long)]
        school: Option<i64>,

        /// Only students of this class
        #[arg(long)]
        class: Option<i64>,
    },

    /// Import a filled workbook into the data file
    Import {
        /// Workbook path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Campaign id
        #[arg(short, long)]
        campaign: CampaignId,

        /// User recorded on touched results (overrides config)
        #[arg(long)]
        actor: Option<String>,
    },

    /// Set one result by hand
    Set {
        /// Campaign id
        #[arg(short, long)]
        campaign: CampaignId,

        #[arg(long)]
        student: i64,

        #[arg(long)]
        group: i64,

        #[arg(long)]
        indicator: i64,

        /// Sub-indicator id, for indicators that have them
        #[arg(long)]
        sub: Option<i64>,

        /// Store false instead of true
        #[arg(long)]
        clear: bool,

        /// User recorded on the result (overrides config)
        #[arg(long)]
        actor: Option<String>,
    },

    /// Per-column counts of recorded and marked results
    Summary {
        /// Campaign id
        #[arg(short, long)]
        campaign: CampaignId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Columns { campaign, json } => cmd_columns(&cli.data, campaign, json),
        Commands::Export {
            campaign,
            output,
            template,
            school,
            class,
        } => {
            let filter = RosterFilter {
                school_id: school,
                class_id: class,
            };
            cmd_export(&cli.data, &config, campaign, &output, template, filter)
        }
        Commands::Import {
            file,
            campaign,
            actor,
        } => cmd_import(&cli.data, &config, &file, campaign, actor),
        Commands::Set {
            campaign,
            student,
            group,
            indicator,
            sub,
            clear,
            actor,
        } => {
            let leaf = HeaderColumnMeta::new(group, indicator, sub);
            let key = ResultKey::new(student, campaign, leaf);
            let actor = actor.unwrap_or_else(|| config.import.actor.clone());
            cmd_set(&cli.data, key, !clear, &actor)
        }
        Commands::Summary { campaign } => cmd_summary(&cli.data, campaign),
    }
}

fn campaign_columns(store: &MemoryStore, campaign: CampaignId) -> Result<Vec<DynamicColumn>> {
    if store.campaign(campaign)?.is_none() {
        bail!("Campaign {campaign} not found");
    }
    Ok(resolve_columns(store, campaign)?)
}

fn column_label(column: &DynamicColumn) -> String {
    match &column.sub_indicator_name {
        Some(sub) => format!("{} / {} / {}", column.group_name, column.indicator_name, sub),
        None => format!("{} / {}", column.group_name, column.indicator_name),
    }
}

fn cmd_columns(data: &Path, campaign: CampaignId, json: bool) -> Result<()> {
    let store = data::load(data)?;
    let columns = campaign_columns(&store, campaign)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }
    for column in &columns {
        println!("{:>4}  {}", column.column_index, column_label(column));
    }
    Ok(())
}

fn cmd_export(
    data: &Path,
    config: &Config,
    campaign: CampaignId,
    output: &Path,
    template: bool,
    filter: RosterFilter,
) -> Result<()> {
    let store = data::load(data)?;
    let exporter = config.exporter().filter(filter);
    let bytes = if template {
        exporter.export_template(&store, campaign)?
    } else {
        exporter.export_campaign(&store, campaign)?
    };

    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn cmd_import(
    data: &Path,
    config: &Config,
    file: &Path,
    campaign: CampaignId,
    actor: Option<String>,
) -> Result<()> {
    let mut store = data::load(data)?;
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut options = config.import_options();
    if let Some(actor) = actor {
        options = options.actor(actor);
    }

    let summary = import_workbook(&mut store, &bytes, campaign, &options)
        .with_context(|| format!("Import of {} failed", file.display()))?;
    data::save(&store, data)?;

    info!(file = %file.display(), campaign, "import saved");
    println!(
        "Imported {} rows ({} skipped): {} created, {} updated, {} cells left unchanged",
        summary.rows_read,
        summary.rows_skipped,
        summary.created,
        summary.updated,
        summary.cells_skipped
    );
    Ok(())
}

fn cmd_set(data: &Path, key: ResultKey, value: bool, actor: &str) -> Result<()> {
    let mut store = data::load(data)?;
    let record = store.set_result(key, value, actor)?;
    println!(
        "Student {} result {:?} = {}",
        record.student_id,
        record.leaf(),
        record.value
    );
    data::save(&store, data)
}

fn cmd_summary(data: &Path, campaign: CampaignId) -> Result<()> {
    let store = data::load(data)?;
    let columns = campaign_columns(&store, campaign)?;
    let records = store.results(campaign)?;

    for tally in tally_results(&columns, &records) {
        println!(
            "{:>4}  {:>4} / {:<4}  {}",
            tally.column.column_index,
            tally.marked,
            tally.recorded,
            column_label(&tally.column)
        );
    }
    Ok(())
}
