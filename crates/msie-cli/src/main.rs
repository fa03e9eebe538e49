//! MSIE engine host command-line tool
//!
//! Evaluates expressions, runs script files and manages precompiled
//! scripts through any of the engine modes.

mod commands;
mod logger;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use msie_engine::{JsEngineMode, JsEngineSettings, MsieJsEngine};

use output::StyledOutput;

#[derive(Parser)]
#[command(name = "msie")]
#[command(about = "Run JavaScript through the MSIE engine modes", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine mode: auto, ie, edge or activescript
    #[arg(long, global = true)]
    mode: Option<JsEngineMode>,

    /// Engine settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// When to use colors: auto, always or never
    #[arg(long, global = true, value_name = "WHEN")]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression and print its value
    Eval {
        /// Expression to evaluate
        expression: String,
    },

    /// Execute a script file
    Run {
        /// Script file
        file: PathBuf,
    },

    /// Precompile a script file into a serialized buffer
    Precompile {
        /// Script file
        file: PathBuf,
        /// Where to write the buffer
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Execute a script from its source and precompiled buffer
    RunPrecompiled {
        /// Script file the buffer was made from
        file: PathBuf,
        /// Precompiled buffer
        buffer: PathBuf,
    },
}

fn verbosity(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<JsEngineSettings> {
    let mut settings = match &cli.settings {
        Some(path) => JsEngineSettings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => JsEngineSettings::default(),
    };
    if let Some(mode) = cli.mode {
        settings.engine_mode = mode;
    }
    Ok(settings)
}

fn run(cli: &Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let engine = MsieJsEngine::new(settings).context("creating engine")?;
    log::debug!(target: "msie::cli", "using {}", engine.mode());

    match &cli.command {
        Commands::Eval { expression } => commands::eval::execute(&engine, expression, cli.json, out),
        Commands::Run { file } => commands::run::execute(&engine, file),
        Commands::Precompile { file, output } => commands::precompile::compile(&engine, file, output, out),
        Commands::RunPrecompiled { file, buffer } => commands::precompile::run(&engine, file, buffer),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logger::init(verbosity(cli.verbose)) {
        eprintln!("warning: {}", err);
    }

    let mut out = StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));
    match run(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.report_error(&err, cli.json);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity(0), LevelFilter::Warn);
        assert_eq!(verbosity(1), LevelFilter::Info);
        assert_eq!(verbosity(2), LevelFilter::Debug);
        assert_eq!(verbosity(7), LevelFilter::Trace);
    }

    #[test]
    fn test_mode_aliases_parse() {
        let cli = Cli::try_parse_from(["msie", "--mode", "ie", "eval", "1"]).unwrap();
        assert_eq!(cli.mode, Some(JsEngineMode::ChakraIeJsRt));
        let cli = Cli::try_parse_from(["msie", "eval", "1", "--mode", "activescript"]).unwrap();
        assert_eq!(cli.mode, Some(JsEngineMode::ChakraActiveScript));
        assert!(Cli::try_parse_from(["msie", "--mode", "v8", "eval", "1"]).is_err());
    }

    #[test]
    fn test_precompile_requires_output() {
        assert!(Cli::try_parse_from(["msie", "precompile", "a.js"]).is_err());
        let cli = Cli::try_parse_from(["msie", "precompile", "a.js", "-o", "a.bin"]).unwrap();
        assert!(matches!(cli.command, Commands::Precompile { .. }));
    }

    #[test]
    fn test_mode_flag_overrides_settings() {
        let cli = Cli::try_parse_from(["msie", "--mode", "edge", "eval", "1"]).unwrap();
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.engine_mode, JsEngineMode::ChakraEdgeJsRt);

        let cli = Cli::try_parse_from(["msie", "eval", "1"]).unwrap();
        assert_eq!(load_settings(&cli).unwrap().engine_mode, JsEngineMode::Auto);
    }
}
