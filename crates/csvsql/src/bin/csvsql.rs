//! csvsql command line: load CSV tables, then run one query or a shell.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use csvsql::logging::LogConfig;
use csvsql::{format, Engine, EngineConfig, OutputFormat, Shell};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "csvsql", version, about = "SQL-like queries over CSV files")]
struct Cli {
    /// Tables to load before running, as TABLE=FILE
    #[arg(value_name = "TABLE=FILE", value_parser = parse_table_arg)]
    tables: Vec<(String, PathBuf)>,

    /// Run these statements instead of starting the shell
    #[arg(short, long, value_name = "QUERY")]
    execute: Option<String>,

    /// Output format for SELECT results
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, env = "CSVSQL_LOG", default_value = "error")]
    log_level: String,

    /// Also write logs to this daily-rolling file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print load and query timings
    #[arg(long)]
    timing: bool,
}

fn parse_table_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, file)) if !name.is_empty() && !file.is_empty() => {
            Ok((name.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected TABLE=FILE, found '{}'", arg)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(cli.log_level.as_str());
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_both(path);
    }
    let _guard = match log_config.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("csvsql: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = EngineConfig::default()
        .with_format(cli.format)
        .with_echo_timing(cli.timing);
    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Output failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: EngineConfig) -> io::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let echo_timing = config.echo_timing;
    let format = config.format;
    let mut engine = Engine::with_config(config);

    for (name, path) in &cli.tables {
        match engine.load_csv(name, path) {
            Ok(report) => format::write_loaded(&mut out, &[report], echo_timing)?,
            Err(e) => {
                eprintln!("csvsql: cannot load {}: {}", path.display(), e);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    if let Some(query) = cli.execute {
        // Results are written as each statement finishes
        let outcome = engine.execute_with(&query, |result| {
            format::write_result(&mut out, result, format, echo_timing)?;
            Ok(())
        });
        out.flush()?;
        return match outcome {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!("csvsql: {}", e);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let stdin = io::stdin();
    let mut shell = Shell::new(engine);
    if !stdin.is_terminal() {
        shell = shell.without_prompt();
    }
    shell.run(stdin.lock(), out)?;
    Ok(ExitCode::SUCCESS)
}
