//! Vendor control panel command.

use clap::Args;
use patchbay_io::{Direction, Error};

use super::common::open_host;

#[derive(Args)]
pub struct ControlPanelArgs {
    /// Device name, fragment or index
    device: String,
}

pub fn run(host_name: Option<&str>, args: ControlPanelArgs) -> anyhow::Result<()> {
    let host = open_host(host_name)?;
    let device = host
        .find_device(&args.device, Direction::Capture)
        .or_else(|_| host.find_device(&args.device, Direction::Playback))?;

    match host.show_control_panel(&device.name) {
        Ok(()) => {
            println!("Opened control panel for {}", device.name);
            Ok(())
        }
        Err(Error::Unsupported(reason)) => {
            anyhow::bail!("Control panel unavailable: {}", reason)
        }
        Err(e) => Err(e.into()),
    }
}
