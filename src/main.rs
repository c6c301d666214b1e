use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use rightcodes_dashboard::commands::{
    self,
    dashboard::DashboardOptions,
    doctor::DoctorOptions,
    logs::{LogsOptions, OutputFormat},
    GlobalOptions,
};
use rightcodes_dashboard::config::Config;
use rightcodes_dashboard::logging::init_logging;

#[derive(Parser)]
#[command(name = "rightcodes")]
#[command(about = "Terminal dashboard for right.codes quota, burn rate and usage logs")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
struct GlobalArgs {
    /// API token (overrides RIGHTCODES_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,
    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Dashboard(DashboardArgs),
    /// Print one page of the usage log
    Logs {
        /// Time range: a duration like 24h or 7d, or `today`
        #[arg(long)]
        range: Option<String>,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Entries per page
        #[arg(long)]
        page_size: Option<u32>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Probe every endpoint and save a key-only report
    Doctor {
        /// Report path (defaults to the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the report instead of saving it
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct DashboardArgs {
    /// Refresh interval such as 30s or 5m; `0` or `off` disables periodic refresh
    #[arg(long)]
    watch: Option<String>,
    /// Time range: a duration like 24h or 7d, or `today`
    #[arg(long)]
    range: Option<String>,
    /// Window used for the burn rate
    #[arg(long)]
    rate_window: Option<String>,
    /// Trend bucket size: auto, hour or day
    #[arg(long)]
    granularity: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Dashboard(DashboardArgs::default()));

    let mut config = Config::load()?;
    GlobalOptions {
        token: cli.global.token,
        base_url: cli.global.base_url,
    }
    .apply(&mut config);
    if let Commands::Dashboard(args) = &command {
        DashboardOptions {
            watch: args.watch.clone(),
            range: args.range.clone(),
            rate_window: args.rate_window.clone(),
            granularity: args.granularity.clone(),
        }
        .apply(&mut config.refresh);
    }
    config.validate()?;

    // The dashboard owns the terminal, so its logs go to the file
    let force_file = matches!(command, Commands::Dashboard(_));
    let _guard = init_logging(&config.logging, &config.paths.log_directory, force_file)?;

    match command {
        Commands::Dashboard(_) => commands::run_dashboard_command(&config).await,
        Commands::Logs {
            range,
            page,
            page_size,
            format,
        } => {
            let options = LogsOptions {
                range,
                page,
                page_size,
                format,
            };
            commands::run_logs(&config, &options).await
        }
        Commands::Doctor { out, no_save } => {
            commands::run_doctor(&config, &DoctorOptions { out, no_save }).await
        }
    }
}
