use std::path::Path;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use lpwrite_api::{BucketFilter, Precision};
use lpwrite_http::Connection;
use lpwrite_pipeline::{BatchConfig, DestinationSpec, RetryPolicy};

use crate::error::CliError;
use crate::input::InputSource;

const DEFAULT_CONFIG: &str = "lpwrite.toml";
const DEFAULT_HOST: &str = "http://localhost:9999";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Parser)]
#[command(name = "lpwrite", about = "Write line protocol data to a time-series store")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write points to the store
    Write(WriteArgs),
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// HTTP address of the store
    #[arg(long, global = true, env = "INFLUX_HOST")]
    pub host: Option<String>,

    /// API token
    #[arg(long, short = 't', global = true, env = "INFLUX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub skip_verify: bool,

    /// Per-request HTTP timeout in ms (0 = none)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Путь к TOML конфиг файлу
    #[arg(long, global = true, env = "LPWRITE_CONFIG")]
    pub config: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct WriteArgs {
    /// Line protocol: literal text, "-" for stdin, or "@path" for a file
    pub input: String,

    /// The name of the destination bucket
    #[arg(long, short = 'b', env = "BUCKET_NAME")]
    pub bucket: Option<String>,

    /// The ID of the destination bucket
    #[arg(long, env = "BUCKET_ID")]
    pub bucket_id: Option<String>,

    /// The name of the organization that owns the bucket
    #[arg(long, short = 'o', env = "INFLUX_ORG")]
    pub org: Option<String>,

    /// The ID of the organization that owns the bucket
    #[arg(long, env = "INFLUX_ORG_ID")]
    pub org_id: Option<String>,

    /// Precision of the timestamps: ns, us, ms or s
    #[arg(long, short = 'p', env = "PRECISION")]
    pub precision: Option<String>,

    /// Максимум записей в одном batch'е
    #[arg(long)]
    pub max_records: Option<usize>,

    /// Максимальный размер batch'а в байтах
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Flush a partial batch after this many ms (0 = never)
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Attempts per batch for retryable failures (1 = no retry)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Pause between attempts in ms
    #[arg(long)]
    pub retry_backoff_ms: Option<u64>,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub token: Option<String>,
    pub skip_verify: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub org: Option<String>,
    pub org_id: Option<String>,
    pub bucket: Option<String>,
    pub bucket_id: Option<String>,
    pub precision: Option<Precision>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

pub fn load_config(path: &str) -> Result<FileConfig, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| CliError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: default < config.toml < env/CLI.
///
/// Всё, что можно проверить без I/O, проверяется здесь: precision,
/// id'шники, взаимоисключающие флаги, границы batch'а.
#[derive(Debug)]
pub struct Effective {
    pub connection: Connection,
    pub filter: BucketFilter,
    pub precision: Precision,
    pub batch: BatchConfig,
    pub retry: RetryPolicy,
    pub input: InputSource,
}

impl Effective {
    pub fn new(global: &GlobalArgs, args: &WriteArgs) -> Result<Self, CliError> {
        let cfg = match &global.config {
            Some(path) => load_config(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => load_config(DEFAULT_CONFIG)?,
            None => FileConfig::default(),
        };

        let precision: Precision = match args.precision.as_deref() {
            Some(raw) => raw.parse()?,
            None => cfg.precision.unwrap_or_default(),
        };

        let filter = DestinationSpec {
            bucket: args.bucket.clone().or(cfg.bucket),
            bucket_id: args.bucket_id.clone().or(cfg.bucket_id),
            org: args.org.clone().or(cfg.org),
            org_id: args.org_id.clone().or(cfg.org_id),
        }
        .to_filter()?;

        let batch = BatchConfig {
            max_records: args.max_records.unwrap_or(cfg.batch.max_records),
            max_bytes: args.max_bytes.unwrap_or(cfg.batch.max_bytes),
            flush_interval_ms: args.flush_interval_ms.unwrap_or(cfg.batch.flush_interval_ms),
        };
        batch.validate()?;

        let retry = RetryPolicy {
            max_attempts: args.max_attempts.unwrap_or(cfg.retry.max_attempts),
            backoff_ms: args.retry_backoff_ms.unwrap_or(cfg.retry.backoff_ms),
        };
        retry.validate()?;

        Ok(Self {
            connection: Connection {
                host: global
                    .host
                    .clone()
                    .or(cfg.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
                token: global.token.clone().or(cfg.token),
                skip_verify: global.skip_verify || cfg.skip_verify.unwrap_or(false),
                timeout: match global.timeout_ms.or(cfg.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS) {
                    0 => None,
                    ms => Some(Duration::from_millis(ms)),
                },
            },
            filter,
            precision,
            batch,
            retry,
            input: InputSource::parse(&args.input),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lpwrite_api::Id;

    use super::*;

    fn write_args(input: &str) -> WriteArgs {
        WriteArgs { input: input.into(), bucket: Some("telemetry".into()), ..Default::default() }
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn global_with(file: &tempfile::NamedTempFile) -> GlobalArgs {
        GlobalArgs { config: Some(file.path().to_string_lossy().into_owned()), ..Default::default() }
    }

    #[test]
    fn empty_config_file_gives_defaults() {
        let file = config_file("");
        let eff = Effective::new(&global_with(&file), &write_args("m v=1")).unwrap();

        assert_eq!(eff.connection.host, "http://localhost:9999");
        assert_eq!(eff.connection.token, None);
        assert!(!eff.connection.skip_verify);
        assert_eq!(eff.connection.timeout, Some(Duration::from_secs(60)));
        assert_eq!(eff.precision, Precision::Nanoseconds);
        assert_eq!(eff.batch.max_records, 5000);
        assert_eq!(eff.batch.max_bytes, 500_000);
        assert_eq!(eff.retry.max_attempts, 1);
        assert_eq!(eff.filter.name.as_deref(), Some("telemetry"));
        assert_eq!(eff.input, InputSource::Inline("m v=1".into()));
    }

    #[test]
    fn file_values_fill_gaps_and_cli_wins() {
        let file = config_file(
            r#"
host = "https://store.example.com"
token = "from-file"
skip_verify = true
org = "acme"
precision = "s"

[batch]
max_records = 100
flush_interval_ms = 0

[retry]
max_attempts = 3
"#,
        );
        let global = GlobalArgs { token: Some("from-cli".into()), ..global_with(&file) };
        let args = WriteArgs { precision: Some("ms".into()), max_bytes: Some(2048), ..write_args("-") };

        let eff = Effective::new(&global, &args).unwrap();

        assert_eq!(eff.connection.host, "https://store.example.com");
        assert_eq!(eff.connection.token.as_deref(), Some("from-cli"));
        assert!(eff.connection.skip_verify);
        assert_eq!(eff.filter.org.as_deref(), Some("acme"));
        assert_eq!(eff.precision, Precision::Milliseconds);
        assert_eq!(eff.batch.max_records, 100);
        assert_eq!(eff.batch.max_bytes, 2048);
        assert_eq!(eff.batch.flush_interval(), None);
        assert_eq!(eff.retry.max_attempts, 3);
        assert_eq!(eff.retry.backoff_ms, 1000);
        assert_eq!(eff.input, InputSource::Stdin);
    }

    #[test]
    fn unknown_precision_is_a_config_error() {
        let file = config_file("");
        let args = WriteArgs { precision: Some("furlongs".into()), ..write_args("m v=1") };

        let err = Effective::new(&global_with(&file), &args).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("furlongs"));
    }

    #[test]
    fn conflicting_bucket_flags_are_rejected() {
        let file = config_file("");
        let args = WriteArgs { bucket_id: Some("020f755c3c082000".into()), ..write_args("m v=1") };

        let err = Effective::new(&global_with(&file), &args).unwrap_err();
        assert_eq!(err.to_string(), "please specify one of bucket or bucket-id");
    }

    #[test]
    fn ids_are_decoded() {
        let file = config_file("bucket_id = \"020f755c3c082000\"\norg_id = \"020f755c3c082001\"\n");
        let args = WriteArgs { input: "m v=1".into(), ..Default::default() };

        let eff = Effective::new(&global_with(&file), &args).unwrap();
        assert_eq!(eff.filter.id, Some("020f755c3c082000".parse::<Id>().unwrap()));
        assert_eq!(eff.filter.org_id, Some("020f755c3c082001".parse::<Id>().unwrap()));
    }

    #[test]
    fn zero_batch_limit_is_rejected() {
        let file = config_file("");
        let args = WriteArgs { max_records: Some(0), ..write_args("m v=1") };
        assert!(Effective::new(&global_with(&file), &args).is_err());
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let global = GlobalArgs { config: Some(path.to_string_lossy().into_owned()), ..Default::default() };

        let err = Effective::new(&global, &write_args("m v=1")).unwrap_err();
        assert!(err.to_string().starts_with("cannot read config"));
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let file = config_file("[batch]\nmax_records = \"lots\"\n");
        let err = Effective::new(&global_with(&file), &write_args("m v=1")).unwrap_err();
        assert!(err.to_string().starts_with("bad config"));
    }

    #[test]
    fn precision_from_file_is_typed() {
        let file = config_file("precision = \"us\"\n");
        let eff = Effective::new(&global_with(&file), &write_args("m v=1")).unwrap();
        assert_eq!(eff.precision, Precision::Microseconds);

        let file = config_file("precision = \"furlongs\"\n");
        let err = Effective::new(&global_with(&file), &write_args("m v=1")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("bad config"), "{msg}");
        assert!(msg.contains("furlongs"), "{msg}");
    }

    #[test]
    fn request_timeout_is_merged() {
        let file = config_file("timeout_ms = 2500\n");
        let eff = Effective::new(&global_with(&file), &write_args("m v=1")).unwrap();
        assert_eq!(eff.connection.timeout, Some(Duration::from_millis(2500)));

        let global = GlobalArgs { timeout_ms: Some(0), ..global_with(&file) };
        let eff = Effective::new(&global, &write_args("m v=1")).unwrap();
        assert_eq!(eff.connection.timeout, None);

        let cli = Cli::try_parse_from(["lpwrite", "--timeout-ms", "750", "write", "m v=1"]).unwrap();
        assert_eq!(cli.global.timeout_ms, Some(750));
    }

    #[test]
    fn cli_parses_write_subcommand() {
        let cli = Cli::try_parse_from([
            "lpwrite", "write", "--bucket", "telemetry", "--org", "acme", "-p", "s", "@data.lp",
        ])
        .unwrap();
        let Commands::Write(args) = cli.command;
        assert_eq!(args.bucket.as_deref(), Some("telemetry"));
        assert_eq!(args.org.as_deref(), Some("acme"));
        assert_eq!(args.precision.as_deref(), Some("s"));
        assert_eq!(args.input, "@data.lp");
    }
}
