use std::os::fd::{AsFd, AsRawFd};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use drm::control::Device as _;

use kmslease::config::Config;
use kmslease::event_loop::{self, EventLoop};
use kmslease::lease::{Lease, Selection};

#[derive(Parser)]
#[command(name = "kmslease")]
#[command(version)]
#[command(about = "Lease a display output from a Wayland compositor", long_about = None)]
struct Cli {
    /// Config file to use instead of $XDG_CONFIG_HOME/kmslease/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lease the connector with this name instead of the first available one
    #[arg(long)]
    connector: Option<String>,

    /// Release the lease right after printing the resources
    #[arg(long)]
    no_hold: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };
    if cli.connector.is_some() {
        config.connector = cli.connector;
    }
    if cli.no_hold {
        config.hold = false;
    }

    let selection = config.selection();
    if let Selection::Named(name) = &selection {
        log::info!("looking for connector {name}");
    }

    let mut lease = Lease::acquire(&selection).context("could not lease a connector")?;
    print_resources(&lease)?;

    if config.hold {
        hold(&mut lease)?;
    }

    Ok(())
}

fn print_resources(lease: &Lease) -> anyhow::Result<()> {
    let card = lease.card();
    let res = lease.resources();
    println!("leased card fd {}", lease.as_fd().as_raw_fd());
    for info in card.connectors(res)? {
        println!(
            "  connector {:?}: {:?}-{} {:?}, {} mode(s)",
            info.handle(),
            info.interface(),
            info.interface_id(),
            info.state(),
            info.modes().len(),
        );
    }
    for &crtc in res.crtcs() {
        let info = card.get_crtc(crtc)?;
        println!("  crtc {:?}: mode {:?}", crtc, info.mode().map(|m| m.size()));
    }
    println!("  {} encoder(s)", res.encoders().len());
    Ok(())
}

/// Keep the lease until a signal arrives or the compositor revokes it.
fn hold(lease: &mut Lease) -> anyhow::Result<()> {
    let (quit_read, quit_write) = event_loop::pipe()?;
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        signal_hook::low_level::pipe::register(signal, quit_write.as_raw_fd())?;
    }

    let mut event_loop = EventLoop::new()?;
    event_loop.add_fd(lease.wayland().as_raw_fd(), event_loop::Event::Wayland)?;
    event_loop.add_fd(quit_read.as_raw_fd(), event_loop::Event::Quit)?;

    log::info!("holding the lease, press Ctrl-C to release it");
    loop {
        match event_loop.poll()? {
            event_loop::Event::Wayland => {
                lease.wayland().poll()?;
                if lease.wayland().finished() {
                    log::warn!("the compositor revoked the lease");
                    return Ok(());
                }
            }
            event_loop::Event::Quit => {
                log::info!("releasing the lease");
                return Ok(());
            }
        }
    }
}
