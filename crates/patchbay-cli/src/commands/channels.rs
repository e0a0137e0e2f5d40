//! Device channel listing command.

use clap::Args;

use super::common::{direction, open_host};

#[derive(Args)]
pub struct ChannelsArgs {
    /// Device name, fragment or index
    device: String,

    /// Describe the playback side instead of capture
    #[arg(long)]
    output: bool,
}

pub fn run(host_name: Option<&str>, args: ChannelsArgs) -> anyhow::Result<()> {
    let host = open_host(host_name)?;
    let direction = direction(args.output);
    let device = host.find_device(&args.device, direction)?;
    let names = host.channel_names(&device.name, direction)?;

    println!("{} channels of {}:", direction, device.name);
    for (idx, name) in names.iter().enumerate() {
        println!("  [{}] {}", idx, name);
    }
    Ok(())
}
