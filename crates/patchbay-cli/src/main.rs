//! patchbay CLI - route one audio device into another in real time.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Real-time capture-to-playback audio bridge", long_about = None)]
struct Cli {
    /// Audio host to use (e.g. "ASIO", "ALSA", "JACK"); platform default if omitted
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio devices
    Devices(commands::devices::DevicesArgs),

    /// Show the channel names of a device
    Channels(commands::channels::ChannelsArgs),

    /// Show the sample rates a device accepts
    Rates(commands::rates::RatesArgs),

    /// Open a device's vendor control panel
    ControlPanel(commands::control_panel::ControlPanelArgs),

    /// Bridge a capture device to a playback device until Ctrl+C
    Run(commands::run::RunArgs),

    /// Create, inspect and list saved sessions
    Session(commands::session::SessionArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();
    let host = cli.host.as_deref();

    match cli.command {
        Commands::Devices(args) => commands::devices::run(host, args),
        Commands::Channels(args) => commands::channels::run(host, args),
        Commands::Rates(args) => commands::rates::run(host, args),
        Commands::ControlPanel(args) => commands::control_panel::run(host, args),
        Commands::Run(args) => commands::run::run(host, args),
        Commands::Session(args) => commands::session::run(args),
    }
}
