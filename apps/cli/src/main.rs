use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use design_search_engine::{
    BalanceMode, BenchConfig, ConfigError, CsvTraceSink, JsonlTraceSink, NormalizationMode,
    RuleSet, RunConfig, SearchEngine, TraceSink, run_bench,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXIT_RUNTIME: u8 = 1;
const EXIT_INVALID_CONFIG: u8 = 2;

const DEFAULT_HARD_M: usize = 2;
const DEFAULT_SOFT_ALPHA: f64 = 1.0;
const DEFAULT_SOFT_TEMPERATURE: f64 = 1.0;
const DEFAULT_WARMUP_DEPTH: usize = 10;

/// Multi-objective beam search over design states.
#[derive(Parser, Debug)]
#[command(name = "design-search")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one search and write its trace rows.
    Trace(TraceArgs),
    /// Repeat the search and print timing statistics as JSON.
    Bench(BenchArgs),
}

#[derive(Args, Debug)]
struct TraceArgs {
    #[command(flatten)]
    run: RunArgs,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Write rows here instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[command(flatten)]
    run: RunArgs,

    #[arg(long)]
    warmup: Option<usize>,

    #[arg(long)]
    iterations: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BalanceArg {
    Off,
    Hard,
    Soft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NormalizationArg {
    Fixed,
    Running,
}

/// Flags shared by `trace` and `bench`. Each one overrides the matching
/// field of `--config` (or of the defaults).
#[derive(Args, Debug)]
struct RunArgs {
    /// JSON run configuration; missing fields take their defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON rule list; the built-in catalogue otherwise.
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    #[arg(long)]
    depth: Option<usize>,

    #[arg(long)]
    beam: Option<usize>,

    #[arg(long, value_enum)]
    balance: Option<BalanceArg>,

    #[arg(long)]
    hard_m: Option<usize>,

    #[arg(long)]
    soft_alpha: Option<f64>,

    #[arg(long)]
    soft_temperature: Option<f64>,

    #[arg(long)]
    entropy_beta: Option<f64>,

    /// Starting lambda; the midpoint of the bounds otherwise.
    #[arg(long)]
    lambda_init: Option<f64>,

    #[arg(long)]
    lambda_min: Option<f64>,

    #[arg(long)]
    lambda_max: Option<f64>,

    #[arg(long)]
    lambda_target_entropy: Option<f64>,

    #[arg(long)]
    lambda_k: Option<f64>,

    #[arg(long)]
    lambda_ema: Option<f64>,

    #[arg(long, value_enum)]
    normalization: Option<NormalizationArg>,

    #[arg(long)]
    warmup_depth: Option<usize>,

    /// Score the Field objective with its neutral value.
    #[arg(long)]
    no_field: bool,

    /// Fill the timing columns.
    #[arg(long)]
    field_profile: bool,

    #[arg(long, conflicts_with = "final_only")]
    log_per_depth: bool,

    /// Emit only the last depth's row.
    #[arg(long)]
    final_only: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Score Field projections on the rayon pool.
    #[arg(long)]
    parallel: bool,

    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,

    #[arg(long)]
    legacy_collapse: bool,
}

impl RunArgs {
    fn base_config(&self) -> anyhow::Result<RunConfig> {
        match &self.config {
            Some(path) => read_json(path),
            None => Ok(RunConfig::default()),
        }
    }

    fn rule_set(&self) -> anyhow::Result<RuleSet> {
        match &self.rules {
            Some(path) => read_json(path),
            None => Ok(RuleSet::default_catalogue()),
        }
    }

    fn apply(&self, mut cfg: RunConfig) -> RunConfig {
        if let Some(v) = self.depth {
            cfg.depth = v;
        }
        if let Some(v) = self.beam {
            cfg.beam_width = v;
        }
        cfg.balance = self.balance_mode(cfg.balance);
        if let Some(v) = self.entropy_beta {
            cfg.entropy_beta = v;
        }
        if self.lambda_init.is_some() {
            cfg.lambda_init = self.lambda_init;
        }
        if let Some(v) = self.lambda_min {
            cfg.lambda_min = v;
        }
        if let Some(v) = self.lambda_max {
            cfg.lambda_max = v;
        }
        if let Some(v) = self.lambda_target_entropy {
            cfg.lambda_target_entropy = v;
        }
        if let Some(v) = self.lambda_k {
            cfg.lambda_k = v;
        }
        if let Some(v) = self.lambda_ema {
            cfg.lambda_ema = v;
        }
        cfg.normalization = self.normalization_mode(cfg.normalization);
        if self.no_field {
            cfg.field_enabled = false;
        }
        if self.field_profile {
            cfg.field_profile = true;
        }
        if self.log_per_depth {
            cfg.log_per_depth = true;
        }
        if self.final_only {
            cfg.log_per_depth = false;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if self.parallel {
            cfg.parallel_scoring = true;
        }
        if self.deadline_ms.is_some() {
            cfg.deadline_ms = self.deadline_ms;
        }
        if self.legacy_collapse {
            cfg.legacy_collapse = true;
        }
        cfg
    }

    /// `--balance` picks the mode; the mode parameters refine whatever mode
    /// ends up selected.
    fn balance_mode(&self, current: BalanceMode) -> BalanceMode {
        let mode = match self.balance {
            None => current,
            Some(BalanceArg::Off) => BalanceMode::Off,
            Some(BalanceArg::Hard) => match current {
                BalanceMode::Hard { m } => BalanceMode::Hard { m },
                _ => BalanceMode::Hard { m: DEFAULT_HARD_M },
            },
            Some(BalanceArg::Soft) => match current {
                soft @ BalanceMode::Soft { .. } => soft,
                _ => BalanceMode::Soft {
                    alpha: DEFAULT_SOFT_ALPHA,
                    temperature: DEFAULT_SOFT_TEMPERATURE,
                },
            },
        };
        match mode {
            BalanceMode::Off => BalanceMode::Off,
            BalanceMode::Hard { m } => BalanceMode::Hard {
                m: self.hard_m.unwrap_or(m),
            },
            BalanceMode::Soft { alpha, temperature } => BalanceMode::Soft {
                alpha: self.soft_alpha.unwrap_or(alpha),
                temperature: self.soft_temperature.unwrap_or(temperature),
            },
        }
    }

    fn normalization_mode(&self, current: NormalizationMode) -> NormalizationMode {
        let mode = match self.normalization {
            None => current,
            Some(NormalizationArg::Running) => NormalizationMode::Running,
            Some(NormalizationArg::Fixed) => match current {
                fixed @ NormalizationMode::Fixed { .. } => fixed,
                NormalizationMode::Running => NormalizationMode::Fixed {
                    warmup_depth: DEFAULT_WARMUP_DEPTH,
                },
            },
        };
        match mode {
            NormalizationMode::Fixed { warmup_depth } => NormalizationMode::Fixed {
                warmup_depth: self.warmup_depth.unwrap_or(warmup_depth),
            },
            NormalizationMode::Running => NormalizationMode::Running,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_INVALID_CONFIG)
            } else {
                ExitCode::from(EXIT_RUNTIME)
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn dispatch(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Trace(args) => trace(args),
        Command::Bench(args) => bench(args),
    }
}

fn trace(args: TraceArgs) -> anyhow::Result<()> {
    let config = args.run.apply(args.run.base_config()?);
    let rules = args.run.rule_set()?;
    // Validation happens before the output file is created.
    let engine = SearchEngine::new(config, rules)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink: Box<dyn TraceSink> = match args.format {
        Format::Csv => Box::new(CsvTraceSink::new(writer)),
        Format::Jsonl => Box::new(JsonlTraceSink::new(writer)),
    };
    let report = engine.run_with_sink(sink.as_mut())?;
    info!(
        depths = report.depths_completed,
        stop_reason = ?report.stop_reason,
        "trace written"
    );
    Ok(())
}

fn bench(args: BenchArgs) -> anyhow::Result<()> {
    let mut config = BenchConfig {
        run: args.run.apply(args.run.base_config()?),
        ..BenchConfig::default()
    };
    if let Some(v) = args.warmup {
        config.warmup = v;
    }
    if let Some(v) = args.iterations {
        config.iterations = v;
    }
    let rules = args.run.rule_set()?;
    let result = run_bench(&config, &rules)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
