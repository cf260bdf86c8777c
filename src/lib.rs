//! Bridge decoded infrared remote frames to a virtual USB HID device.
//!
//! The kernel's rc-core decodes the IR pulse train; we read scancode frames
//! from a lirc chardev, run them through a small dispatch state machine
//! (repeat handling, mode switching, code lookup) and emit keyboard or
//! consumer/media key presses on a uinput device.

pub mod config;
pub mod dispatch;
pub mod hid;
pub mod led;
pub mod lirc;
pub mod maps;
pub mod mode;
pub mod repeat;
