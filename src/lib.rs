pub mod cli;
pub mod config;
pub mod tools;

use snafu::{Location, ResultExt, Snafu};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use cli::{Cli, Commands};
use config::{Config, ConfigOverrides, ParsedConfig};
use tools::text_editor::{ResultEnvelope, TextEditor};

pub const LOG_ENV: &str = "SANDBOX_EDITOR_LOG";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Config Error"))]
    Config {
        #[snafu(source)]
        source: config::ConfigError,
    },

    #[snafu(display("Error reading request"))]
    ReadRequest {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        source: io::Error,
    },

    #[snafu(display("Error writing result"))]
    WriteResult {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        source: io::Error,
    },

    #[snafu(display("Error serializing result"))]
    Serialize {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        source: serde_json::Error,
    },

    #[snafu(display("Unable to open log file '{}'", path.display()))]
    LogFile {
        path: PathBuf,
        #[snafu(source)]
        source: io::Error,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type SResult<T> = Result<T, Error>;

// Builds a tracing subscriber from the `SANDBOX_EDITOR_LOG` environment variable.
// stdout carries results, so logs go to stderr.
pub fn init_logger() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_env(LOG_ENV))
        .with_writer(io::stderr)
        .without_time()
        .with_ansi(false)
        .init()
}

pub fn init_logger_with_path<P: AsRef<Path>>(path: P) -> SResult<()> {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context(LogFileSnafu { path })?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .context(LogFileSnafu { path })?;

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_env(LOG_ENV))
        .with_writer(file)
        .without_time()
        .with_ansi(false)
        .init();
    Ok(())
}

/// Resolve the config (explicit file, env var, user config dir, defaults),
/// apply command line overrides and build the editor.
pub fn load_editor(config_path: Option<&Path>, overrides: &ConfigOverrides) -> SResult<TextEditor> {
    let mut config = Config::load(config_path).context(ConfigSnafu)?;
    config.apply_overrides(overrides);
    let parsed_config: ParsedConfig = config.try_into().context(ConfigSnafu)?;
    Ok(TextEditor::from_config(&parsed_config))
}

/// Handle one JSON request per line until `reader` is exhausted, writing one
/// JSON result per line. Blank lines are skipped. Returns how many requests
/// were handled.
pub fn run_stdio<R: BufRead, W: Write>(
    editor: &TextEditor,
    reader: R,
    mut writer: W,
) -> SResult<usize> {
    let mut handled = 0;
    for line in reader.lines() {
        let line = line.context(ReadRequestSnafu)?;
        if line.trim().is_empty() {
            continue;
        }

        let envelope = editor.handle_json(&line);
        write_envelope(&mut writer, &envelope)?;
        handled += 1;
    }
    Ok(handled)
}

pub fn write_envelope<W: Write>(writer: &mut W, envelope: &ResultEnvelope) -> SResult<()> {
    serde_json::to_writer(&mut *writer, envelope).context(SerializeSnafu)?;
    writeln!(writer).context(WriteResultSnafu)?;
    writer.flush().context(WriteResultSnafu)
}

pub fn run(cli: Cli) -> SResult<()> {
    let overrides = cli.overrides();

    match cli.command.unwrap_or_default() {
        Commands::Serve => {
            let editor = load_editor(cli.config.as_deref(), &overrides)?;
            info!(root = %editor.sandbox().root().display(), "serving requests on stdin");
            let handled = run_stdio(&editor, io::stdin().lock(), io::stdout().lock())?;
            info!(handled, "stdin closed");
        }
        Commands::Exec { request } => {
            let editor = load_editor(cli.config.as_deref(), &overrides)?;
            let raw = if request == "-" {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context(ReadRequestSnafu)?;
                buffer
            } else {
                request
            };
            let envelope = editor.handle_json(raw.trim());
            write_envelope(&mut io::stdout().lock(), &envelope)?;
        }
        Commands::Schema => {
            let definition =
                serde_json::to_string_pretty(&tools::tool_definition()).context(SerializeSnafu)?;
            println!("{definition}");
        }
    }

    Ok(())
}
