//! lazy-import - analyze and rewrite lazy-import loader calls.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lazy_import_transform::{
    adapter::FilterConfig,
    analyzer::{analyze_dir, AnalysisReport},
    transform_unit, Dialect, ErrorPolicy, FileFilter, FileHook, TransformOptions, TransformResult,
};

#[derive(Parser, Debug)]
#[command(name = "lazy-import")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log every transform and skip decision
    #[arg(long, global = true)]
    debug: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report loader calls under a directory without modifying anything
    Analyze(AnalyzeArgs),
    /// Print the transformed version of a single file
    Transform(TransformArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    root: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct TransformArgs {
    /// Source file to transform
    file: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// JSON config file with transform options and file filters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Module name that exports the loader (repeatable)
    #[arg(long = "module")]
    modules: Vec<String>,

    /// Named export that is a loader (repeatable)
    #[arg(long = "import-name")]
    import_names: Vec<String>,

    /// Do not treat the default import as a loader
    #[arg(long)]
    no_default_import: bool,

    /// Chunk name template, `[name]` is the derived name
    #[arg(long)]
    template: Option<String>,

    /// Identifier used for the injected helper
    #[arg(long)]
    helper_name: Option<String>,

    /// Do not emit webpackChunkName comments
    #[arg(long)]
    no_chunk_comment: bool,

    /// Drop options arguments instead of routing them through the helper
    #[arg(long)]
    no_preserve_options: bool,

    /// Rewrite calls with non-literal module paths too
    #[arg(long)]
    allow_dynamic: bool,

    /// Extra exclude pattern (regex, repeatable)
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// File extension to include (repeatable, replaces the defaults)
    #[arg(long = "ext")]
    extensions: Vec<String>,
}

impl EngineArgs {
    fn resolve(&self, debug: bool) -> Result<(TransformOptions, FilterConfig)> {
        let (mut options, mut filter) = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                let options = TransformOptions::from_json(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?;
                let filter: FilterConfig = serde_json::from_str(&raw)
                    .with_context(|| format!("invalid file filters in {}", path.display()))?;
                (options, filter)
            }
            None => (TransformOptions::default(), FilterConfig::default()),
        };

        if !self.modules.is_empty() {
            options.module_names = self.modules.clone();
        }
        if !self.import_names.is_empty() {
            options.import_names = self.import_names.clone();
        }
        if self.no_default_import {
            options.import_default = false;
        }
        if let Some(template) = &self.template {
            options.chunk_name_template = template.clone();
        }
        if let Some(name) = &self.helper_name {
            options.helper_name = name.clone();
        }
        options.chunk_comment &= !self.no_chunk_comment;
        options.preserve_options &= !self.no_preserve_options;
        options.string_literals_only &= !self.allow_dynamic;
        options.debug |= debug;

        filter.exclude.extend(self.excludes.iter().cloned());
        if !self.extensions.is_empty() {
            filter.extensions = self.extensions.clone();
        }
        Ok((options, filter))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let outcome = match &cli.command {
        Command::Analyze(args) => run_analyze(args, &cli),
        Command::Transform(args) => run_transform(args, &cli),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_analyze(args: &AnalyzeArgs, cli: &Cli) -> Result<ExitCode> {
    if !args.root.is_dir() {
        anyhow::bail!("not a directory: {}", args.root.display());
    }
    let (options, filter) = args.engine.resolve(cli.debug)?;
    let hook = FileHook::new(options, FileFilter::new(&filter)?, ErrorPolicy::Fail);

    let report = analyze_dir(&args.root, &hook);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_transform(args: &TransformArgs, cli: &Cli) -> Result<ExitCode> {
    let (options, _) = args.engine.resolve(cli.debug)?;
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let dialect = Dialect::from_path(&args.file);
    let result = transform_unit(&args.file.to_string_lossy(), &source, dialect, &options)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.code);
        print_warnings(&result);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_warnings(result: &TransformResult) {
    for warning in &result.warnings {
        eprintln!("{}: {}", "warning".yellow().bold(), warning);
    }
}

fn print_report(report: &AnalysisReport) {
    for file in &report.files {
        println!("{}", file.path.bold());
        for t in &file.transforms {
            println!(
                "  {} {}:{}  {} -> {} ({})",
                "+".green(),
                t.line,
                t.column,
                t.module_path.as_deref().unwrap_or("<dynamic>"),
                t.chunk_name.as_deref().unwrap_or("-").cyan(),
                t.strategy.dimmed(),
            );
        }
        for s in &file.skipped {
            println!(
                "  {} {}:{}  {}  {}",
                "-".yellow(),
                s.line,
                s.column,
                s.reason.yellow(),
                s.snippet.dimmed(),
            );
        }
        for w in &file.warnings {
            println!("  {} {}", "!".red(), w);
        }
    }
    for failure in &report.failures {
        println!("{} {}: {}", "x".red().bold(), failure.path, failure.message);
    }

    println!();
    println!(
        "{} files scanned, {} with loader calls: {} transformed, {} skipped, {} helper injections",
        report.files_scanned,
        report.files_with_loader_calls,
        report.total_transforms.to_string().green(),
        report.total_skipped.to_string().yellow(),
        report.helpers_injected,
    );
}
