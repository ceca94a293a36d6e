use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trybot_core::{parse_patch_list, CorrelationKey, Target};
use trybot_exec::SystemRunner;
use trybot_farm::{CancelToken, SystemClock};
use trybot_runner::{absolute_path, canonicalize_path, doctor, Config, RemoteBuild, RunOptions};

#[derive(Parser)]
#[command(name = "trybot", version, about = "Build a chromeos image on the remote trybot farm with a local toolchain")]
struct Cli {
    /// Config file (default ~/.config/trybot/trybot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload patches, submit a build and optionally fetch and install it
    Run {
        #[arg(short = 'c', long)]
        chromeos_root: String,
        /// Target to build, e.g. lumpy-release
        #[arg(short, long)]
        target: String,
        /// Local toolchain tree to upload as a patch
        #[arg(short, long)]
        gcc_dir: Option<String>,
        /// Branch to build (default master); excludes --chromeos-version
        #[arg(short, long)]
        branch: Option<String>,
        /// Review patch numbers, separated by ',' or spaces
        #[arg(short, long, default_value = "")]
        patch: String,
        /// Build locally into --dest-dir instead of on the farm
        #[arg(short, long)]
        local: bool,
        #[arg(short, long)]
        dest_dir: Option<String>,
        #[arg(long)]
        chrome_version: Option<String>,
        /// Image version to build against; excludes --branch
        #[arg(long)]
        chromeos_version: Option<String>,
        /// Install the result into the chroot and the latest image dir
        #[arg(short, long)]
        replace_sysroot: bool,
    },

    /// Wait for a submitted build and print its number
    Poll {
        /// Remote description the build was submitted with
        #[arg(long)]
        key: String,
    },

    /// Fetch and unpack the artifacts of a finished build
    Fetch {
        #[arg(short, long)]
        target: String,
        #[arg(short, long)]
        number: u64,
        #[arg(short, long)]
        dest_dir: String,
        /// Image version; looked up in the artifact store when omitted
        #[arg(long)]
        chromeos_version: Option<String>,
        /// Also install into this chromeos root
        #[arg(long)]
        install_into: Option<String>,
    },

    /// Check required tools and, optionally, a chromeos root
    Doctor {
        #[arg(short = 'c', long)]
        chromeos_root: Option<String>,
    },

    /// Write the default config file
    ConfigInit {
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::ConfigInit { force } = cli.cmd {
        let path = cli.config.unwrap_or_else(Config::default_path);
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Config::default().save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let cfg = Config::load_or_default(cli.config.as_deref())?;
    let runner = SystemRunner;
    let clock = SystemClock;
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            info!("interrupted, stopping");
            cancel.cancel();
        })
        .context("install Ctrl-C handler")?;
    }
    let build = RemoteBuild::new(&cfg, &runner, &clock, cancel);

    match cli.cmd {
        Command::Run {
            chromeos_root,
            target,
            gcc_dir,
            branch,
            patch,
            local,
            dest_dir,
            chrome_version,
            chromeos_version,
            replace_sysroot,
        } => {
            let opts = RunOptions {
                chromeos_root: canonicalize_path(&chromeos_root)?,
                target,
                gcc_dir: gcc_dir.as_deref().map(canonicalize_path).transpose()?,
                branch,
                patches: parse_patch_list(&patch),
                local,
                dest_dir: dest_dir.as_deref().map(absolute_path).transpose()?,
                chrome_version,
                chromeos_version,
                replace_sysroot,
            };
            let report = build.run(&opts)?;
            println!("{}", report.key);
            if let Some(outcome) = report.outcome {
                println!("build {}", outcome.sentinel());
            }
            if let Some(layout) = report.sysroot {
                println!("installed {}", layout.board_dir.display());
            }
        }
        Command::Poll { key } => {
            let outcome = build.poll(&CorrelationKey::from_raw(key))?;
            println!("{}", outcome.sentinel());
        }
        Command::Fetch { target, number, dest_dir, chromeos_version, install_into } => {
            let target = Target::parse(&target)?;
            let dest = absolute_path(&dest_dir)?;
            let install_root = install_into.as_deref().map(canonicalize_path).transpose()?;
            let staged = build.stage(&target, number, &dest, chromeos_version.as_deref(), install_root.as_deref())?;
            println!("{} artifacts of {} into {}", staged.artifacts.len(), staged.version, dest.display());
        }
        Command::Doctor { chromeos_root } => {
            let root = chromeos_root.as_deref().map(canonicalize_path).transpose()?;
            doctor(root.as_deref(), &cfg)?;
            println!("OK");
        }
        Command::ConfigInit { .. } => {}
    }
    Ok(())
}
