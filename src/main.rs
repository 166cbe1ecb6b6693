use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use protoline::{
    BatchReport, Blacklist, FilterConfig, PipelineConfig, ProtocolSummary, filter_submissions,
    normalize_batch, read_submissions_file,
};

#[derive(Parser)]
#[command(name = "protoline")]
#[command(author, version, about = "Differentiation protocol normalization pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize submitted protocols and write a JSON report
    Normalize {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file for the normalized report (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for a plain-text summary
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print step counts, durations and warnings without writing files
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Submission table (.csv, .json or .jsonl)
    #[arg(short, long)]
    input: PathBuf,

    /// Pipeline config file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blacklist file (JSON)
    #[arg(long)]
    blacklist: Option<PathBuf>,

    /// Only process this publication id
    #[arg(long)]
    publication: Option<String>,

    /// Only process this participant id
    #[arg(long)]
    participant: Option<String>,

    /// Maximum number of submissions to process
    #[arg(long)]
    limit: Option<usize>,

    /// Hours assigned to steps without a usable duration
    #[arg(long)]
    fallback_hours: Option<f64>,

    /// Minimum hours a step occupies in the layout
    #[arg(long, conflicts_with = "no_layout_floor")]
    min_layout_hours: Option<f64>,

    /// Disable the layout floor
    #[arg(long)]
    no_layout_floor: bool,

    /// Minimum share of the timeline per step (0-1)
    #[arg(long)]
    min_share: Option<f64>,
}

impl SourceArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(hours) = self.fallback_hours {
            config.duration.fallback_hours = hours;
        }
        if self.no_layout_floor {
            config.duration.min_layout_hours = None;
        } else if let Some(hours) = self.min_layout_hours {
            config.duration.min_layout_hours = Some(hours);
        }
        if let Some(share) = self.min_share {
            config.layout.min_share = share;
        }

        config.validate().context("Invalid pipeline settings")?;
        Ok(config)
    }

    fn filter_config(&self) -> Result<FilterConfig> {
        let mut filter = FilterConfig {
            publication: self.publication.clone(),
            participant: self.participant.clone(),
            limit: self.limit,
            ..Default::default()
        };

        if let Some(path) = &self.blacklist {
            let blacklist = Blacklist::from_file(path)?;
            filter = filter.with_blacklist(&blacklist);
        }

        Ok(filter)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize {
            source,
            output,
            summary,
            verbose,
        } => {
            setup_logging(verbose);
            normalize_protocols(&source, output, summary)
        }
        Commands::Inspect { source, verbose } => {
            setup_logging(verbose);
            inspect_protocols(&source)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn normalize_protocols(
    source: &SourceArgs,
    output: PathBuf,
    summary: Option<PathBuf>,
) -> Result<()> {
    let config = source.pipeline_config()?;
    let filter = source.filter_config()?;

    info!("Loading submissions from {:?}", source.input);
    let records =
        read_submissions_file(&source.input).context("Failed to read submission table")?;
    let records = filter_submissions(records, &filter);

    let result = normalize_batch(&records, &config);

    if let Some(path) = &summary {
        info!("Writing summary to {:?}", path);
        ProtocolSummary::new(&result.protocols).write_file(path)?;
    }

    let report = BatchReport::from_result(result);
    info!("Writing report to {:?}", output);
    report.write_json(&output)?;

    info!(
        "Complete: {} normalized, {} failed, {} warnings",
        report.metadata.normalized, report.metadata.failed, report.metadata.warnings
    );

    Ok(())
}

fn inspect_protocols(source: &SourceArgs) -> Result<()> {
    let config = source.pipeline_config()?;
    let filter = source.filter_config()?;

    let records =
        read_submissions_file(&source.input).context("Failed to read submission table")?;
    let records = filter_submissions(records, &filter);
    let result = normalize_batch(&records, &config);

    println!("Protocol Inspection");
    println!("===================");
    println!("Submissions: {}", records.len());
    println!("Normalized: {}", result.protocols.len());
    println!("Failed: {}", result.failures.len());
    println!();

    for protocol in &result.protocols {
        println!(
            "PMID {} | Participant {}: {} steps (culturing: {}), {} pruned, {} warnings",
            protocol.publication_id,
            protocol.participant_id,
            protocol.steps.len(),
            protocol.culturing,
            protocol.removed_steps.len(),
            protocol.warnings.len()
        );
        for step in &protocol.steps {
            println!(
                "  {:<10} {:>8.1} h  {:>5.1}%  {}",
                step.label,
                step.duration.hours,
                step.proportion * 100.0,
                step.duration.label.replace('\n', " ")
            );
        }
        for warning in &protocol.warnings {
            println!("  warning: {}", warning);
        }
    }

    if !result.failures.is_empty() {
        println!();
        println!("Failures");
        println!("--------");
        for failure in &result.failures {
            println!(
                "PMID {} | Participant {}: {}",
                failure.publication_id, failure.participant_id, failure.error
            );
        }
    }

    Ok(())
}
