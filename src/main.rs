use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use voicemail_sweeper::{
    Sweeper, SweeperConfig,
    config::SweepMode,
    observability::{init_tracing, metrics},
};

/// CLI arguments for the voicemail sweeper
#[derive(Parser, Debug)]
#[command(version, about = "Erase or archive old voicemail recordings", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./voicemail-sweeper.toml, then
    /// ~/.config/voicemail-sweeper/voicemail-sweeper.toml)
    #[arg(short, long, global = true, env = "VOICEMAIL_SWEEPER_CONFIG")]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run one sweep and print the result as JSON (default)
    Sweep(SweepArgs),
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to ~/.config/voicemail-sweeper/voicemail-sweeper.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Export the JSON schema for the configuration file
    Schema {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show enabled compile-time features
    Features,
}

/// Overrides applied on top of the `[sweep]` section.
#[derive(clap::Args, Debug, Default)]
struct SweepArgs {
    /// Retention window in days (still clamped to min_retention_days)
    #[arg(long)]
    retention_days: Option<u32>,
    /// List and fetch, but delete and write nothing
    #[arg(long)]
    dry_run: bool,
    /// Teardown to apply: erase or archive
    #[arg(long)]
    mode: Option<SweepMode>,
}

const CONFIG_FILE_NAME: &str = "voicemail-sweeper.toml";

/// Commented starting point written by `init`.
fn default_config_toml() -> &'static str {
    r#"# Voicemail Sweeper Configuration

[sweep]
# "archive" copies audio to storage, "erase" deletes it from the API
mode = "archive"
retention_days = 30
min_retention_days = 7
page_size = 100
concurrency_limit = 20
# 0 disables the ceiling / budget
record_ceiling = 1000
failure_budget = 50
actionable_statuses = ["completed"]
fetch_payload = false
delete_secondary = false
archive_before_erase = false
dry_run = false

[api]
account_id = "${ACCOUNT_ID}"
auth_token = "${AUTH_TOKEN}"
# root_url = "https://api.twilio.com"
# api_version = "2010-04-01"
# payload_format = "mp3"

# [api.http]
# timeout_secs = 120
# proxy = "http://proxy.internal:3128"
# no_proxy = "localhost,127.0.0.1"

[storage]
backend = "s3"

[storage.s3]
bucket = "voicemail-archives"
# region = "us-east-1"
# key_prefix = "voicemail"

# [storage.filesystem]
# path = "/var/lib/voicemail-sweeper/archive"

[observability.logging]
level = "info"
format = "compact"

# [observability.metrics]
# enabled = true
# textfile_path = "/var/lib/node_exporter/textfile/voicemail_sweeper.prom"
"#
}

/// Get the default config file path.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("voicemail-sweeper").join(CONFIG_FILE_NAME))
}

/// Resolve the config path: explicit, then working directory, then user config dir.
fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(path);
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(cwd_config);
    }

    if let Some(default_path) = default_config_path()
        && default_path.exists()
    {
        return Ok(default_path);
    }

    Err(format!(
        "No config file found. Create one with `voicemail-sweeper init` or pass --config \
         (looked for ./{CONFIG_FILE_NAME} and the user config directory)"
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => run_init(output, force),
        Some(Command::Schema { output }) => run_schema_export(output),
        Some(Command::Features) => {
            run_features();
            ExitCode::SUCCESS
        }
        Some(Command::Sweep(sweep_args)) => run_sweep(args.config.as_deref(), sweep_args).await,
        None => run_sweep(args.config.as_deref(), SweepArgs::default()).await,
    }
}

/// Load config, run one sweep, print the result.
async fn run_sweep(explicit_config_path: Option<&str>, overrides: SweepArgs) -> ExitCode {
    let config_path = match resolve_config_path(explicit_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut config = match SweeperConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(days) = overrides.retention_days {
        config.sweep.retention_days = days;
    }
    if overrides.dry_run {
        config.sweep.dry_run = true;
    }
    if let Some(mode) = overrides.mode {
        config.sweep.mode = mode;
    }
    // Overrides can change which sections are required
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Warning: {}", e);
    }
    if let Err(e) = metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    tracing::info!(
        config = %config_path.display(),
        mode = %config.sweep.mode,
        dry_run = config.sweep.dry_run,
        "Loaded configuration"
    );

    let outcome = match Sweeper::from_config(&config).await {
        Ok(sweeper) => sweeper.run().await,
        Err(e) => Err(e),
    };

    let code = match outcome {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize sweep result");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Sweep failed");
            ExitCode::FAILURE
        }
    };

    match metrics::write_textfile(&config.observability.metrics) {
        Ok(true) => tracing::debug!("Metrics textfile written"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to write metrics textfile"),
    }

    code
}

/// Create a default configuration file.
fn run_init(output: Option<String>, force: bool) -> ExitCode {
    let Some(output_path) = output.map(PathBuf::from).or_else(default_config_path) else {
        eprintln!("Could not determine default config path. Please specify one with --output.");
        return ExitCode::FAILURE;
    };

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        return ExitCode::FAILURE;
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = std::fs::write(&output_path, default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set ACCOUNT_ID and AUTH_TOKEN, then run a dry run:");
    println!(
        "  voicemail-sweeper sweep --dry-run --config {}",
        output_path.display()
    );
    ExitCode::SUCCESS
}

/// Export JSON schema for the configuration file to file or stdout
fn run_schema_export(output: Option<String>) -> ExitCode {
    #[cfg(feature = "json-schema")]
    {
        let content = match SweeperConfig::json_schema_string() {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Failed to serialize config schema: {}", e);
                return ExitCode::FAILURE;
            }
        };

        match output {
            Some(path) => {
                if let Err(e) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write to {}: {}", path, e);
                    return ExitCode::FAILURE;
                }
                eprintln!("Config JSON schema written to {}", path);
            }
            None => println!("{}", content),
        }
        ExitCode::SUCCESS
    }
    #[cfg(not(feature = "json-schema"))]
    {
        let _ = output;
        eprintln!("Error: JSON schema export requires the 'json-schema' feature");
        ExitCode::FAILURE
    }
}

/// Print enabled compile-time features and build profile.
fn run_features() {
    let version = env!("CARGO_PKG_VERSION");

    let features: &[(&str, &str, bool)] = &[
        ("cli", "Runtime", cfg!(feature = "cli")),
        ("native-http", "Runtime", cfg!(feature = "native-http")),
        ("s3-storage", "Storage", cfg!(feature = "s3-storage")),
        ("prometheus", "Observability", cfg!(feature = "prometheus")),
        ("json-schema", "Validation & Export", cfg!(feature = "json-schema")),
    ];

    let profile = if cfg!(feature = "full") {
        "full"
    } else if cfg!(feature = "minimal") {
        "minimal"
    } else {
        "custom"
    };

    println!("Voicemail Sweeper v{version}\n");
    println!("Build profile: {profile}");
    match profile {
        "full" => println!("  (full = minimal + s3-storage, prometheus, json-schema)\n"),
        "minimal" => println!("  (minimal = cli, native-http; filesystem archive only)\n"),
        _ => println!(),
    }

    println!("Compile-time features:");

    let mut current_group = "";
    for &(name, group, enabled) in features {
        if group != current_group {
            if !current_group.is_empty() {
                println!();
            }
            println!("  {group}:");
            current_group = group;
        }
        let status = if enabled { "enabled" } else { "disabled" };
        println!("    {name:<32} {status}");
    }
}
