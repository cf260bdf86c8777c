//! Mode indicator behind the Linux LED class
//!
//! The controller hands us colors already scaled for brightness, packed in
//! GRB order (a leftover of the NeoPixel the reference hardware used, and
//! the documented wire format at this boundary). The sysfs backend unpacks
//! the word into per-channel intensities.

use crate::dispatch::Indicator;
use log::debug;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// A multicolor LED class device, e.g. /sys/class/leds/rgb:status.
pub struct SysfsLed {
    path: PathBuf,
}

impl SysfsLed {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<SysfsLed> {
        let path = path.as_ref().to_path_buf();

        // colors arrive pre-scaled, so pin brightness to the maximum once
        // and only ever touch multi_intensity afterwards
        let max = fs::read_to_string(path.join("max_brightness"))?;
        fs::write(path.join("brightness"), max.trim())?;

        Ok(SysfsLed { path })
    }
}

impl Indicator for SysfsLed {
    fn set_color(&mut self, grb: u32) -> io::Result<()> {
        let g = (grb >> 16) & 0xff;
        let r = (grb >> 8) & 0xff;
        let b = grb & 0xff;

        fs::write(self.path.join("multi_intensity"), format!("{r} {g} {b}\n"))
    }
}

/// Stand-in when no LED is configured; mode is still visible in the log.
pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn set_color(&mut self, grb: u32) -> io::Result<()> {
        debug!("indicator color 0x{grb:06x} (no led configured)");

        Ok(())
    }
}
