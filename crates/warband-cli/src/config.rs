use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use std::path::PathBuf;
use warband::{Capability, JobOptions, Targets, Thresholds, validate_squad_size};
use warband_client::{ClientConfig, DEFAULT_BASE_URL};

/// Runtime configuration for the `warband` binary.
///
/// Every flag can also be set through the environment variable named in its
/// help text; a `.env` file in the working directory is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "warband",
    version,
    about = "Runs a squad composition job against a remote optimizer"
)]
pub struct CliArgs {
    /// Base URL of the optimizer service.
    ///
    /// Environment variable: `WARBAND_SERVER_URL`
    #[arg(long, env = "WARBAND_SERVER_URL", default_value_t = String::from(DEFAULT_BASE_URL))]
    pub server_url: String,

    /// Path to the JSON build catalog, either an array of builds or an
    /// object with a `builds` array.
    ///
    /// Environment variable: `WARBAND_CATALOG`
    #[arg(long, env = "WARBAND_CATALOG")]
    pub catalog: PathBuf,

    /// Number of players in the squad (1 to 50).
    ///
    /// Environment variable: `WARBAND_SQUAD_SIZE`
    #[arg(long, env = "WARBAND_SQUAD_SIZE", default_value_t = 10)]
    pub squad_size: usize,

    /// Time budget handed to the optimizer. The optimizer's own default
    /// applies when unset.
    ///
    /// Environment variable: `WARBAND_TIME_LIMIT_MS`
    #[arg(long, env = "WARBAND_TIME_LIMIT_MS")]
    pub time_limit_ms: Option<u64>,

    /// Uptime target as `<boon>=<fraction>`, e.g. `quickness=0.9`. Repeat
    /// for several boons. Targets are sent with the job and replace the
    /// default warning thresholds.
    ///
    /// Environment variable: `WARBAND_TARGETS` (comma separated)
    #[arg(long = "target", env = "WARBAND_TARGETS", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Timeout for job submission, in milliseconds.
    ///
    /// Environment variable: `WARBAND_REQUEST_TIMEOUT_MS`
    #[arg(long, env = "WARBAND_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Timeout for connecting to the optimizer, in milliseconds.
    ///
    /// Environment variable: `WARBAND_CONNECT_TIMEOUT_MS`
    #[arg(long, env = "WARBAND_CONNECT_TIMEOUT_MS", default_value_t = 3_000)]
    pub connect_timeout_ms: u64,

    /// Frames buffered between the stream task and the store.
    ///
    /// Environment variable: `WARBAND_FRAME_BUFFER`
    #[arg(long, env = "WARBAND_FRAME_BUFFER", default_value_t = 32)]
    pub frame_buffer: usize,

    /// Log output format.
    ///
    /// Environment variable: `WARBAND_LOG_FORMAT`
    #[arg(long, env = "WARBAND_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub catalog: PathBuf,
    pub squad_size: usize,
    pub job: JobOptions,
    pub thresholds: Thresholds,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if let Err(e) = validate_squad_size(args.squad_size) {
            bail!("WARBAND_SQUAD_SIZE: {e}");
        }
        if args.frame_buffer == 0 {
            bail!("WARBAND_FRAME_BUFFER must be greater than 0");
        }
        if args.request_timeout_ms == 0 || args.connect_timeout_ms == 0 {
            bail!("Timeouts must be greater than 0");
        }
        if args.server_url.trim().is_empty() {
            bail!("WARBAND_SERVER_URL must not be empty");
        }

        let targets = args
            .targets
            .iter()
            .map(|raw| parse_target(raw))
            .collect::<anyhow::Result<Targets>>()?;
        let thresholds = if targets.is_empty() {
            Thresholds::default()
        } else {
            Thresholds::from_targets(&targets)
        };

        Ok(Self {
            client: ClientConfig {
                base_url: args.server_url,
                request_timeout: Duration::from_millis(args.request_timeout_ms),
                connect_timeout: Duration::from_millis(args.connect_timeout_ms),
                frame_buffer: args.frame_buffer,
            },
            catalog: args.catalog,
            squad_size: args.squad_size,
            job: JobOptions {
                time_limit_ms: args.time_limit_ms,
                targets: (!targets.is_empty()).then_some(targets),
                ..JobOptions::default()
            },
            thresholds,
            log_format: args.log_format,
        })
    }
}

fn parse_target(raw: &str) -> anyhow::Result<(Capability, f64)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("target `{raw}` is not `<boon>=<fraction>`"))?;
    let name = name.trim().to_ascii_lowercase();
    let name = name.strip_suffix("_uptime").unwrap_or(&name);
    let capability =
        Capability::from_name(name).with_context(|| format!("unknown boon `{name}`"))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("target `{raw}` has no numeric value"))?;
    if !(0.0..=1.0).contains(&value) {
        bail!("target `{raw}` must be within 0..=1");
    }
    Ok((capability, value))
}
