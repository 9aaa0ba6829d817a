use clap::Parser;
use deployctl::cli::{Cli, Commands};
use deployctl::compose::{apply, detect_compose, tear_down};
use deployctl::mode::{resolve, DeployMode, PortOverride, Service};
use deployctl::preflight::Preflight;
use envstore::{EnvEntry, EnvStore};
use std::collections::BTreeMap;
use std::process::{exit, Command};

/// Flat file the identity entries are persisted in, relative to the
/// working directory
const ENV_FILE: &str = ".env";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap exits 2 on usage errors; this tool promises 1
            let failed = e.use_stderr();
            let _ = e.print();
            exit(if failed { 1 } else { 0 });
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("✗ {}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Up {
            mode,
            api_port,
            ui_port,
            dry_run,
        } => up(mode, api_port, ui_port, dry_run)?,
        Commands::Down { mode } => {
            let request = resolve(mode, &BTreeMap::new());
            let runtime = detect_compose()?;
            tear_down(&runtime, &request)?;
            println!("✓ {} stack is down", mode);
        }
        Commands::Check => {
            Preflight::with_default_checks().run_all()?;
            println!("✓ all preflight checks passed");
        }
        Commands::Env => {
            let store = EnvStore::new(ENV_FILE);
            let report = store.ensure_entries(&identity_entries()?)?;
            print!("{}", report.summary());
            println!("--- {} ---", store.path().display());
            print!("{}", store.contents()?);
        }
    }
    Ok(())
}

fn up(
    mode: DeployMode,
    api_port: Option<PortOverride>,
    ui_port: Option<PortOverride>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut overrides = BTreeMap::new();
    if let Some(port) = api_port {
        overrides.insert(Service::Api, port);
    }
    if let Some(port) = ui_port {
        overrides.insert(Service::Ui, port);
    }

    let request = resolve(mode, &overrides);
    if dry_run {
        println!("{}", request.to_json()?);
        return Ok(());
    }

    let runtime = detect_compose()?;
    apply(&runtime, &request)?;
    println!(
        "✓ {} stack is up ({})",
        mode,
        request.compose_files.join(", ")
    );
    Ok(())
}

/// Operator identity entries persisted into the env file so containers run
/// with the invoking user's uid/gid.
fn identity_entries() -> Result<Vec<EnvEntry>, std::io::Error> {
    let uid = capture_trimmed("id", &["-u"])?;
    let gid = capture_trimmed("id", &["-g"])?;
    let username = std::env::var("USER").unwrap_or_else(|_| "eduagent".to_string());
    Ok(vec![
        EnvEntry::new("USER_UID", uid),
        EnvEntry::new("USER_GID", gid),
        EnvEntry::new("USERNAME", username),
    ])
}

fn capture_trimmed(program: &str, args: &[&str]) -> Result<String, std::io::Error> {
    let output = Command::new(program).args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
