use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pierre::export::{self, ExportFormat};
use pierre::render::{self, OutputFormat};
use pierre::settings::Settings;
use pierre::{clean, Document, PierreError, Result};

/// A tool for evaluating and documenting hypotheses and evidence using Bayes' rule.
#[derive(Parser)]
#[command(name = "pierre", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (defaults to pierre.json when present)
    #[arg(short, long, global = true, env = "PIERRE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a Bayes document, rewriting it in place
    Eval {
        /// Document to evaluate; reads stdin and writes stdout when omitted
        file: Option<PathBuf>,

        /// Write the result to stdout instead of modifying the file
        #[arg(long)]
        stdout: bool,
    },
    /// Export the hypothesis data of a Bayes document
    Data {
        file: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
    /// Evaluate and render a Bayes document
    Render {
        file: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (pdf needs pdflatex); inferred from the output file suffix when omitted
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// CSS or TeX preamble added to the output
        #[arg(short, long)]
        style: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings, cli.verbose);

    match run(cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(settings: &Settings, verbose: bool) {
    let level = if verbose { "debug" } else { settings.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Eval { file, stdout } => {
            let text = read_input(file.as_deref())?;
            let (annotated, hypotheses) = evaluate(&text, settings)?;
            info!(hypotheses = hypotheses.len(), "evaluated");
            match file {
                Some(path) if !stdout => fs::write(&path, annotated)?,
                _ => io::stdout().write_all(annotated.as_bytes())?,
            }
        }
        Commands::Data { file, output, format } => {
            let text = read_input(file.as_deref())?;
            let (_, hypotheses) = evaluate(&text, settings)?;
            write_output(output.as_deref(), &export::export(&hypotheses, format)?)?;
        }
        Commands::Render { file, output, format, style } => {
            let format = format
                .or_else(|| output.as_deref().and_then(OutputFormat::from_path))
                .unwrap_or(settings.render.format);
            if format == OutputFormat::Pdf && output.is_none() {
                return Err(PierreError::Render(
                    "cannot write PDF to stdout, name an output file with -o".into(),
                ));
            }
            let text = read_input(file.as_deref())?;
            let (annotated, _) = evaluate(&text, settings)?;
            let stylesheet = match style.or_else(|| settings.render.stylesheet.clone()) {
                Some(path) => Some(fs::read_to_string(path)?),
                None => None,
            };
            debug!(?format, "rendering");
            let rendered = render::render(&annotated, format, settings.render_style(), stylesheet.as_deref())?;
            match (format, output.as_deref()) {
                (OutputFormat::Pdf, Some(path)) => render::write_pdf(&rendered, path)?,
                (_, output) => write_output(output, &rendered)?,
            }
        }
    }
    Ok(())
}

// old annotations are always stripped before a run
fn evaluate(text: &str, settings: &Settings) -> Result<(String, pierre::HypothesisTable)> {
    Document::with_options(settings.eval_options()).evaluate(&clean(text))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)?,
        None => io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}
