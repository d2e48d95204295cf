use std::fs;
use std::io;
use std::path::Path;
use std::process;

use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mzcontamer::{MZContamer, MZContamerError};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn configure_log(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let layer = fmt::layer()
                .compact()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::DEBUG.into())
                        .from_env_lossy(),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    tracing_log::LogTracer::init().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(guard)
}

/// Collect the arguments given on the command line itself so they take precedence
/// over configuration files and the environment, while defaults do not.
fn explicit_arguments(
    args: &MZContamer,
    matches: &ArgMatches,
) -> serde_json::Map<String, serde_json::Value> {
    let serde_json::Value::Object(mut values) = serde_json::to_value(args).unwrap_or_default() else {
        return serde_json::Map::new();
    };
    let explicit: Vec<String> = MZContamer::command()
        .get_arguments()
        .map(|arg| arg.get_id().as_str().to_string())
        .filter(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
        .collect();
    values.retain(|k, _| explicit.contains(k));
    values
}

fn load_config() -> Result<MZContamer, figment::Error> {
    let matches = MZContamer::command().get_matches();
    let args = MZContamer::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let mut config = Figment::from(Serialized::defaults(MZContamer::default()))
        .merge(Toml::file("mzcontamer.toml"));
    if let Some(path) = args.config_file.as_ref() {
        config = config.merge(Toml::file_exact(path));
    }
    config
        .merge(Env::prefixed("MZCONTAMER_"))
        .merge(Serialized::defaults(explicit_arguments(&args, &matches)))
        .extract()
}

fn main() -> Result<(), MZContamerError> {
    let args = match load_config() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            process::exit(2);
        }
    };
    let guard = configure_log(args.log_file.as_deref())?;
    if let Err(e) = args.main() {
        error!("{e}");
        drop(guard);
        process::exit(1);
    }
    Ok(())
}
