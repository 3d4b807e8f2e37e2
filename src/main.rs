//! CLI front door for the analysis engine. Loads a program (and its
//! class hierarchy) from the JSON shape [`flowengine::loader`] reads,
//! loads an [`flowengine::config::Config`] from TOML, runs the pipeline,
//! and writes the resulting report — following the same
//! parse-then-run-passes shape as the teacher's sibling CLI binaries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{crate_version, Parser};

use flowengine::{config::Config, engine, loader, output};

#[derive(Parser, Debug)]
#[command(author,
          version = crate_version!(),
          term_width = 80,
          about = "Static analysis engine: pointer analysis, call-graph construction, constant propagation, dead-code detection and taint tracking.",
          long_about = None)]
struct Arguments {
    /// JSON file describing the program's methods and class hierarchy
    /// (see `flowengine::loader` for the schema).
    program_file: PathBuf,

    /// TOML analysis configuration (entry method, which passes to run,
    /// pointer-analysis context sensitivity, taint rules path).
    #[arg(long)]
    config: PathBuf,

    /// Override the config's `output_file`; prints to stdout when unset.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbosity.
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
}

fn run(args: Arguments) -> color_eyre::Result<()> {
    let config = Config::from_file(&args.config)?;
    config.validate()?;

    let (program, hierarchy) = loader::load_program_file(&args.program_file)?;
    log::info!("loaded {} method(s) from {}", program.methods.len(), args.program_file.display());

    let report = engine::run(&program, &hierarchy, &config)?;
    let view = output::build_report(&program, &report);

    let output_path = args.output.as_deref().or(config.output_file.as_deref());
    output::write_report(&view, output_path)?;

    Ok(())
}

fn main() -> ExitCode {
    color_eyre::install().ok();
    let args = Arguments::parse();
    env_logger::Builder::new().filter_level(args.verbose.log_level_filter()).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
