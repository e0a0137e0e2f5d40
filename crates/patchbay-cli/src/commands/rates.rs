//! Supported sample rate probe command.

use clap::Args;

use super::common::{direction, open_host};

#[derive(Args)]
pub struct RatesArgs {
    /// Device name, fragment or index
    device: String,

    /// Probe the playback side instead of capture
    #[arg(long)]
    output: bool,
}

pub fn run(host_name: Option<&str>, args: RatesArgs) -> anyhow::Result<()> {
    let host = open_host(host_name)?;
    let direction = direction(args.output);
    let device = host.find_device(&args.device, direction)?;
    let rates = host.supported_sample_rates(&device.name, direction)?;

    if rates.is_empty() {
        println!("{} reports no supported {} sample rates.", device.name, direction);
        return Ok(());
    }

    println!("{} sample rates of {}:", direction, device.name);
    for rate in rates {
        let marker = if rate == device.default_sample_rate {
            " (default)"
        } else {
            ""
        };
        println!("  {} Hz{}", rate, marker);
    }
    Ok(())
}
