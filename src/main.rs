use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use clusterctx::{
    commands::{self, Session},
    config::{DEFAULT_BASE_DIR, Settings},
    confirm::StdinConfirmer,
    engine::AnsibleEngine,
    inventory::HostRole,
    paths::Paths,
    store::StoreHandle,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "clusterctx")]
#[command(about = "Cluster context switcher - keep multiple cluster inventories and credentials side by side")]
#[command(version)]
struct Cli {
    /// Directory holding the live inventory, component defaults and playbooks
    #[arg(long, global = true, env = "CLUSTERCTX_BASE_DIR", default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Settings file (default: <base-dir>/clusterctx.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Log debug details to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch to a context, creating it from default settings if new
    Checkout {
        /// Context to switch to (prompts when omitted)
        name: Option<String>,
    },

    /// List contexts and the nodes of each reachable cluster
    List,

    /// Show the current context
    Current,

    /// Save the live workspace into the current context
    Save,

    /// Provision the cluster described by the live inventory
    Setup,

    /// Upgrade the current cluster
    Upgrade,

    /// Destroy the current cluster
    Destroy {
        /// Also delete the stored context and fall back to default
        #[arg(long)]
        purge: bool,
    },

    /// Add a worker node
    AddNode { ip: String },
    /// Add a control-plane node
    AddMaster { ip: String },
    /// Add an etcd member
    AddEtcd { ip: String },
    /// Remove a worker node
    DelNode { ip: String },
    /// Remove a control-plane node
    DelMaster { ip: String },
    /// Remove an etcd member
    DelEtcd { ip: String },

    /// Run diagnostics on the store and workspace
    Doctor,

    /// Print shell completions
    Completions { shell: Shell },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    if let Err(error) = run(cli, &ui) {
        tracing::debug!("{error:?}");
        ui.err(format!("{error:#}"));
        exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("clusterctx=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let layer = fmt::layer().compact().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "clusterctx", &mut std::io::stdout());
        return Ok(());
    }

    let settings = Settings::load(&cli.base_dir, cli.config.as_deref())?;
    let paths = Paths::new(&cli.base_dir, &settings)?;
    let store = StoreHandle::new(paths).with_prune(settings.prune_stale);
    let engine = AnsibleEngine::new(&cli.base_dir, &settings);
    let confirmer = StdinConfirmer;
    let session = Session {
        store,
        settings,
        engine: &engine,
        confirmer: &confirmer,
    };

    match cli.command {
        Commands::Checkout { name } => commands::checkout(&session, name, ui),
        Commands::List => commands::list(&session, ui),
        Commands::Current => commands::current(&session, ui),
        Commands::Save => commands::save(&session, ui),
        Commands::Setup => commands::setup(&session, ui),
        Commands::Upgrade => commands::upgrade(&session, ui),
        Commands::Destroy { purge } => commands::destroy(&session, purge, ui),
        Commands::AddNode { ip } => commands::add_host(&session, HostRole::Node, &ip, ui),
        Commands::AddMaster { ip } => commands::add_host(&session, HostRole::Master, &ip, ui),
        Commands::AddEtcd { ip } => commands::add_host(&session, HostRole::Etcd, &ip, ui),
        Commands::DelNode { ip } => commands::del_host(&session, HostRole::Node, &ip, ui),
        Commands::DelMaster { ip } => commands::del_host(&session, HostRole::Master, &ip, ui),
        Commands::DelEtcd { ip } => commands::del_host(&session, HostRole::Etcd, &ip, ui),
        Commands::Doctor => commands::doctor(&session, ui),
        Commands::Completions { .. } => Ok(()),
    }
}
