//! Session file management commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use patchbay_config::paths::session_name_from_path;
use patchbay_config::{
    SessionConfig, default_session_path, ensure_user_sessions_dir, find_session,
    list_user_sessions, user_sessions_dir,
};

use super::common::SessionOverrides;

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Write a new session file
    New {
        /// Session name (saved in the sessions directory) or a .toml path
        name: String,

        #[command(flatten)]
        overrides: SessionOverrides,

        /// Overwrite if the session already exists
        #[arg(long)]
        force: bool,
    },

    /// Validate a session and show its routing
    Show {
        /// Session name or path
        name: String,
    },

    /// List saved sessions
    List,

    /// Show session directories
    Paths,
}

pub fn run(args: SessionArgs) -> anyhow::Result<()> {
    match args.command {
        SessionCommand::New {
            name,
            overrides,
            force,
        } => new_session(&name, &overrides, force),
        SessionCommand::Show { name } => show_session(&name),
        SessionCommand::List => {
            let sessions = list_user_sessions();
            if sessions.is_empty() {
                println!("No saved sessions in {}", user_sessions_dir().display());
                return Ok(());
            }
            println!("Saved Sessions:");
            for path in sessions {
                let name = session_name_from_path(&path).unwrap_or_default();
                println!("  {}", name);
            }
            Ok(())
        }
        SessionCommand::Paths => {
            println!("Sessions directory: {}", user_sessions_dir().display());
            println!("Default session:    {}", default_session_path().display());
            Ok(())
        }
    }
}

/// Where `session new` writes `name`.
fn target_path(name: &str) -> anyhow::Result<PathBuf> {
    let path = PathBuf::from(name);
    if path.extension().is_some_and(|ext| ext == "toml") {
        return Ok(path);
    }
    Ok(ensure_user_sessions_dir()?.join(format!("{}.toml", name)))
}

fn new_session(name: &str, overrides: &SessionOverrides, force: bool) -> anyhow::Result<()> {
    let path = target_path(name)?;
    if path.exists() && !force {
        anyhow::bail!(
            "Session '{}' already exists at {}. Use --force to overwrite.",
            name,
            path.display()
        );
    }

    let session = overrides.to_session()?;
    if let Err(e) = session.validate() {
        anyhow::bail!("Invalid session: {}", e);
    }
    session.save(&path)?;

    println!("Saved session to {}", path.display());
    Ok(())
}

fn show_session(name: &str) -> anyhow::Result<()> {
    let Some(path) = find_session(name) else {
        anyhow::bail!(
            "Session '{}' not found. Use 'patchbay session list' to see saved sessions.",
            name
        );
    };
    let session = SessionConfig::load(&path)?;

    println!("Session: {}", path.display());
    println!("  Capture:  {} ({} ch)", session.capture.device, session.capture.channels);
    println!(
        "  Playback: {} ({})",
        session.playback.device,
        session.layout()
    );
    println!("  Sample rate: {} Hz", session.capture.sample_rate);
    println!(
        "  Latency: {} ms target, {} ms max",
        session.target_latency_ms, session.max_buffer_ms
    );
    println!(
        "  Metering: {}",
        if session.metering.enabled { "on" } else { "off" }
    );

    let layout = session.layout();
    match session.mapping() {
        Ok(mapping) => {
            println!("  Routing:");
            for (output, source) in mapping.sources().iter().enumerate() {
                let role = layout.role(output).map(|r| r.name()).unwrap_or("?");
                println!("    out{} ({}) <- {}", output, role, source);
            }
        }
        Err(e) => println!("  Routing: invalid ({})", e),
    }

    if let Err(e) = session.validate() {
        anyhow::bail!("Invalid session: {}", e);
    }
    println!("  Valid");
    Ok(())
}
