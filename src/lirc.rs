//! Interface to lirc chardevs on Linux
//!
//! The kernel's rc-core does the protocol decoding; in scancode mode a lirc
//! chardev hands us one `lirc_scancode` struct per decoded frame.

use crate::repeat::REPEAT_SENTINEL;
use log::trace;
use nix::{ioctl_read, ioctl_write_ptr};
use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Error, ErrorKind, Read},
    mem,
    os::unix::io::{AsRawFd, RawFd},
    path::{Path, PathBuf},
};

const LIRC_MAGIC: u8 = b'i';

const LIRC_GET_FEATURES: u8 = 0x00;
const LIRC_SET_REC_MODE: u8 = 0x12;

ioctl_read!(lirc_get_features, LIRC_MAGIC, LIRC_GET_FEATURES, u32);
ioctl_write_ptr!(lirc_set_rec_mode, LIRC_MAGIC, LIRC_SET_REC_MODE, u32);

const LIRC_CAN_REC_MODE2: u32 = 0x00040000;
const LIRC_CAN_REC_SCANCODE: u32 = 0x00080000;

const LIRC_MODE_SCANCODE: u32 = 0x00000008;

pub const LIRC_SCANCODE_FLAG_TOGGLE: u16 = 1;
pub const LIRC_SCANCODE_FLAG_REPEAT: u16 = 2;

/// A physical or virtual lirc device
pub struct Lirc {
    path: PathBuf,
    file: File,
    features: u32,
    scancode_mode: bool,
}

/// Type used for receiving decoded IR.
#[repr(C)]
pub struct LircScancode {
    pub timestamp: u64,
    pub flags: u16,
    pub rc_proto: u16,
    pub keycode: u32,
    pub scancode: u64,
}

impl Lirc {
    /// Open a lirc chardev, which should have a path like "/dev/lirc0"
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Lirc> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut features = 0u32;

        if let Ok(0) = unsafe { lirc_get_features(file.as_raw_fd(), &mut features) } {
            Ok(Lirc {
                path: PathBuf::from(path),
                file,
                features,
                scancode_mode: false,
            })
        } else {
            Err(Error::new(
                ErrorKind::NotFound,
                String::from("not a lirc device"),
            ))
        }
    }

    /// Does this lirc device support receiving in decoded scancode format
    pub fn can_receive_scancodes(&self) -> bool {
        (self.features & (LIRC_CAN_REC_MODE2 | LIRC_CAN_REC_SCANCODE)) != 0
    }

    /// Switch to scancode mode
    pub fn scancode_mode(&mut self) -> io::Result<()> {
        if !self.scancode_mode {
            let mode = LIRC_MODE_SCANCODE;

            unsafe { lirc_set_rec_mode(self.file.as_raw_fd(), &mode)? };

            self.scancode_mode = true;
        }

        Ok(())
    }

    /// Read the decoded IR. If there is nothing to be read, the result
    /// vector will be set to length 0. Otherwise, up to the capacity of
    /// result entries will be read.
    pub fn receive_scancodes(&mut self, result: &mut Vec<LircScancode>) -> io::Result<()> {
        self.scancode_mode()?;

        let length = result.capacity() * mem::size_of::<LircScancode>();
        let data = unsafe { std::slice::from_raw_parts_mut(result.as_ptr() as *mut u8, length) };

        let res = self.file.read(data)?;

        unsafe {
            result.set_len(res / mem::size_of::<LircScancode>());
        }

        Ok(())
    }
}

impl AsRawFd for Lirc {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl fmt::Display for Lirc {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.path.display())
    }
}

/// Frame source feeding the dispatcher: one `u32` code per decoded frame.
pub struct LircSource {
    dev: Lirc,
    buf: Vec<LircScancode>,
    next: usize,
}

impl LircSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<LircSource> {
        let mut dev = Lirc::open(path)?;

        if !dev.can_receive_scancodes() {
            return Err(Error::new(
                ErrorKind::Unsupported,
                format!("{dev}: device cannot produce scancodes"),
            ));
        }

        dev.scancode_mode()?;

        Ok(LircSource {
            dev,
            buf: Vec::with_capacity(64),
            next: 0,
        })
    }

    /// The next decoded frame, if one is pending. Frames the kernel flags as
    /// key repeats are collapsed to the repeat sentinel here; the sentinel
    /// has no meaning past this boundary other than "the last button is
    /// still held".
    pub fn poll_frame(&mut self) -> io::Result<Option<u32>> {
        if self.next >= self.buf.len() {
            self.next = 0;

            match self.dev.receive_scancodes(&mut self.buf) {
                Ok(()) => (),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    self.buf.clear();
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }

            if self.buf.is_empty() {
                return Ok(None);
            }
        }

        let entry = &self.buf[self.next];
        self.next += 1;

        let raw = if (entry.flags & LIRC_SCANCODE_FLAG_REPEAT) != 0 {
            REPEAT_SENTINEL
        } else {
            entry.scancode as u32
        };

        trace!("{}: frame 0x{raw:08x}", self.dev);

        Ok(Some(raw))
    }

    /// Re-arm the receiver for the next frame. lirc chardevs re-arm on read,
    /// so this is a formality, but every handled frame ends with this call.
    pub fn resume(&mut self) {}
}

impl AsRawFd for LircSource {
    fn as_raw_fd(&self) -> RawFd {
        self.dev.as_raw_fd()
    }
}
