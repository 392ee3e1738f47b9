mod config;
mod trace;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::OutputFormat;
use jitprof_core::{JsonSink, ProfilerConfig, ReportSink, ShapeProfiler, TextSink};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use trace::Replayer;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "jitprof", version, about = "Hidden-class polymorphism profiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and print the polymorphic access sites
    Report {
        /// JSON-lines trace, or `-` for stdin
        trace: PathBuf,

        /// Config file (defaults to jitprof.toml in this or a parent directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Number of access sites to report
    #[arg(long)]
    max_sites: Option<usize>,

    /// Creation sites listed per access site
    #[arg(long)]
    max_creation_sites: Option<usize>,

    /// Layouts listed per access site
    #[arg(long)]
    max_layouts: Option<usize>,

    /// Sites with this many misses or fewer are omitted
    #[arg(long)]
    min_misses: Option<u64>,
}

impl LimitArgs {
    /// Override the file's `[report]` values with the flags that were given
    fn apply(&self, config: &mut ProfilerConfig) {
        if let Some(n) = self.max_sites {
            config.max_sites = n;
        }
        if let Some(n) = self.max_creation_sites {
            config.max_creation_sites = n;
        }
        if let Some(n) = self.max_layouts {
            config.max_layouts = n;
        }
        if let Some(n) = self.min_misses {
            config.min_misses = n;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Report {
            trace,
            config,
            format,
            limits,
        } => report(trace, config, format, limits)?,
    }

    Ok(())
}

fn report(
    trace: PathBuf,
    config_path: Option<PathBuf>,
    format: Option<OutputFormat>,
    limits: LimitArgs,
) -> Result<()> {
    let config = config::load_config(config_path.as_deref())?;

    let mut limits_config = config.report;
    limits.apply(&mut limits_config);
    let format = format.unwrap_or(config.output.format);

    let reader: Box<dyn BufRead> = if trace.as_os_str() == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(&trace)
            .with_context(|| format!("Failed to open trace {}", trace.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut replayer = Replayer::new(ShapeProfiler::new(limits_config));
    let summary = replayer.replay(reader)?;
    if summary.skipped > 0 {
        tracing::warn!(skipped = summary.skipped, "some trace lines were skipped");
    }

    let stdout = std::io::stdout().lock();
    let mut sink: Box<dyn ReportSink> = match format {
        OutputFormat::Text => Box::new(TextSink::new(stdout)),
        OutputFormat::Json => Box::new(JsonSink::new(stdout)),
    };
    replayer.profiler().end_of_execution(sink.as_mut());

    Ok(())
}
