use clap::Args;
use irhid::{
    config::Settings,
    dispatch::{Indicator, Outcome, RemoteController},
    hid::UinputHid,
    led::{NullIndicator, SysfsLed},
    lirc::LircSource,
};
use log::{info, warn};
use mio::{unix::SourceFd, Events, Interest, Poll, Token};
use nix::fcntl::{FcntlArg, OFlag};
use std::{
    os::unix::io::AsRawFd,
    path::{Path, PathBuf},
};

#[derive(Args)]
pub struct Run {
    /// Select the lirc chardev to use (e.g. /dev/lirc1), overriding the
    /// settings file
    #[arg(long = "device", short = 'd', name = "LIRCDEV")]
    device: Option<PathBuf>,
}

pub fn run(config: &Path, args: &Run) {
    let settings = Settings::load(config);

    let device = args
        .device
        .clone()
        .unwrap_or_else(|| settings.ir.device.clone());

    let mut source = match LircSource::open(&device) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: {}: {e}", device.display());
            std::process::exit(1);
        }
    };

    let mut controller = RemoteController::new(&settings);

    if controller.keyboard().is_empty() && controller.consumer().is_empty() {
        warn!("no mappings configured, only the mode button will do anything");
    }

    let mut hid = match UinputHid::open(
        controller.keyboard().iter().map(|(_, key)| *key),
        controller.consumer().iter().map(|(_, usage)| *usage),
    ) {
        Ok(hid) => hid,
        Err(e) => {
            eprintln!("error: failed to create uinput device: {e}");
            std::process::exit(1);
        }
    };

    let mut indicator: Box<dyn Indicator> = match &settings.led.device {
        Some(path) => match SysfsLed::open(path) {
            Ok(led) => Box::new(led),
            Err(e) => {
                warn!("{}: {e}, indicator disabled", path.display());
                Box::new(NullIndicator)
            }
        },
        None => Box::new(NullIndicator),
    };

    if let Err(e) = controller.refresh_indicator(indicator.as_mut()) {
        warn!("indicator: {e}");
    }

    let raw_fd = source.as_raw_fd();

    if let Err(e) = nix::fcntl::fcntl(raw_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK)) {
        eprintln!("error: {}: {e}", device.display());
        std::process::exit(1);
    }

    let mut poll = match Poll::new() {
        Ok(poll) => poll,
        Err(e) => {
            eprintln!("error: failed to create poll: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = poll
        .registry()
        .register(&mut SourceFd(&raw_fd), Token(0), Interest::READABLE)
    {
        eprintln!("error: failed to add poll: {e}");
        std::process::exit(1);
    }

    info!("ready to receive ir codes on {}", device.display());

    let mut events = Events::with_capacity(4);

    loop {
        loop {
            let raw = match source.poll_frame() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("error: {}: {e}", device.display());
                    std::process::exit(1);
                }
            };

            info!("ir code: 0x{raw:08x}");

            match controller.dispatch(raw, &mut hid, indicator.as_mut()) {
                Ok(Outcome::SentKey(key)) => info!("sent keyboard key 0x{key:02x}"),
                Ok(Outcome::SentUsage(usage)) => info!("sent consumer usage 0x{usage:04x}"),
                // suppressed repeats, mode changes and lookup misses are
                // logged by the dispatcher where needed
                Ok(_) => (),
                Err(e) => {
                    eprintln!("error: hid: {e}");
                    std::process::exit(1);
                }
            }

            source.resume();
        }

        if let Err(e) = poll.poll(&mut events, None) {
            eprintln!("error: poll: {e}");
            std::process::exit(1);
        }
    }
}
