//! Virtual HID device backed by uinput
//!
//! Keyboard mappings carry the value an Arduino-style Keyboard.press would
//! take: printable ASCII, or one of the 0x80+ special key values. Consumer
//! mappings carry a HID consumer page usage. Both are translated to Linux
//! keycodes here, at the transmission boundary.

use crate::dispatch::HidSink;
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, EventType, InputEvent, Key,
};
use log::debug;
use std::io;

/// Translate a keyboard mapping value to a keycode plus whether shift must
/// be held, assuming a US layout on the host.
pub fn keyboard_key(key: u8) -> Option<(Key, bool)> {
    let plain = |key| Some((key, false));
    let shifted = |key| Some((key, true));

    match key {
        b'a' | b'A' => Some((Key::KEY_A, key == b'A')),
        b'b' | b'B' => Some((Key::KEY_B, key == b'B')),
        b'c' | b'C' => Some((Key::KEY_C, key == b'C')),
        b'd' | b'D' => Some((Key::KEY_D, key == b'D')),
        b'e' | b'E' => Some((Key::KEY_E, key == b'E')),
        b'f' | b'F' => Some((Key::KEY_F, key == b'F')),
        b'g' | b'G' => Some((Key::KEY_G, key == b'G')),
        b'h' | b'H' => Some((Key::KEY_H, key == b'H')),
        b'i' | b'I' => Some((Key::KEY_I, key == b'I')),
        b'j' | b'J' => Some((Key::KEY_J, key == b'J')),
        b'k' | b'K' => Some((Key::KEY_K, key == b'K')),
        b'l' | b'L' => Some((Key::KEY_L, key == b'L')),
        b'm' | b'M' => Some((Key::KEY_M, key == b'M')),
        b'n' | b'N' => Some((Key::KEY_N, key == b'N')),
        b'o' | b'O' => Some((Key::KEY_O, key == b'O')),
        b'p' | b'P' => Some((Key::KEY_P, key == b'P')),
        b'q' | b'Q' => Some((Key::KEY_Q, key == b'Q')),
        b'r' | b'R' => Some((Key::KEY_R, key == b'R')),
        b's' | b'S' => Some((Key::KEY_S, key == b'S')),
        b't' | b'T' => Some((Key::KEY_T, key == b'T')),
        b'u' | b'U' => Some((Key::KEY_U, key == b'U')),
        b'v' | b'V' => Some((Key::KEY_V, key == b'V')),
        b'w' | b'W' => Some((Key::KEY_W, key == b'W')),
        b'x' | b'X' => Some((Key::KEY_X, key == b'X')),
        b'y' | b'Y' => Some((Key::KEY_Y, key == b'Y')),
        b'z' | b'Z' => Some((Key::KEY_Z, key == b'Z')),

        b'0' => plain(Key::KEY_0),
        b'1' => plain(Key::KEY_1),
        b'2' => plain(Key::KEY_2),
        b'3' => plain(Key::KEY_3),
        b'4' => plain(Key::KEY_4),
        b'5' => plain(Key::KEY_5),
        b'6' => plain(Key::KEY_6),
        b'7' => plain(Key::KEY_7),
        b'8' => plain(Key::KEY_8),
        b'9' => plain(Key::KEY_9),

        b' ' => plain(Key::KEY_SPACE),
        b'!' => shifted(Key::KEY_1),
        b'"' => shifted(Key::KEY_APOSTROPHE),
        b'#' => shifted(Key::KEY_3),
        b'$' => shifted(Key::KEY_4),
        b'%' => shifted(Key::KEY_5),
        b'&' => shifted(Key::KEY_7),
        b'\'' => plain(Key::KEY_APOSTROPHE),
        b'(' => shifted(Key::KEY_9),
        b')' => shifted(Key::KEY_0),
        b'*' => shifted(Key::KEY_8),
        b'+' => shifted(Key::KEY_EQUAL),
        b',' => plain(Key::KEY_COMMA),
        b'-' => plain(Key::KEY_MINUS),
        b'.' => plain(Key::KEY_DOT),
        b'/' => plain(Key::KEY_SLASH),
        b':' => shifted(Key::KEY_SEMICOLON),
        b';' => plain(Key::KEY_SEMICOLON),
        b'<' => shifted(Key::KEY_COMMA),
        b'=' => plain(Key::KEY_EQUAL),
        b'>' => shifted(Key::KEY_DOT),
        b'?' => shifted(Key::KEY_SLASH),
        b'@' => shifted(Key::KEY_2),
        b'[' => plain(Key::KEY_LEFTBRACE),
        b'\\' => plain(Key::KEY_BACKSLASH),
        b']' => plain(Key::KEY_RIGHTBRACE),
        b'^' => shifted(Key::KEY_6),
        b'_' => shifted(Key::KEY_MINUS),
        b'`' => plain(Key::KEY_GRAVE),
        b'{' => shifted(Key::KEY_LEFTBRACE),
        b'|' => shifted(Key::KEY_BACKSLASH),
        b'}' => shifted(Key::KEY_RIGHTBRACE),
        b'~' => shifted(Key::KEY_GRAVE),

        // Keyboard.h special key values
        0x80 => plain(Key::KEY_LEFTCTRL),
        0x81 => plain(Key::KEY_LEFTSHIFT),
        0x82 => plain(Key::KEY_LEFTALT),
        0x83 => plain(Key::KEY_LEFTMETA),
        0x84 => plain(Key::KEY_RIGHTCTRL),
        0x85 => plain(Key::KEY_RIGHTSHIFT),
        0x86 => plain(Key::KEY_RIGHTALT),
        0x87 => plain(Key::KEY_RIGHTMETA),
        0xb0 => plain(Key::KEY_ENTER),
        0xb1 => plain(Key::KEY_ESC),
        0xb2 => plain(Key::KEY_BACKSPACE),
        0xb3 => plain(Key::KEY_TAB),
        0xc1 => plain(Key::KEY_CAPSLOCK),
        0xc2 => plain(Key::KEY_F1),
        0xc3 => plain(Key::KEY_F2),
        0xc4 => plain(Key::KEY_F3),
        0xc5 => plain(Key::KEY_F4),
        0xc6 => plain(Key::KEY_F5),
        0xc7 => plain(Key::KEY_F6),
        0xc8 => plain(Key::KEY_F7),
        0xc9 => plain(Key::KEY_F8),
        0xca => plain(Key::KEY_F9),
        0xcb => plain(Key::KEY_F10),
        0xcc => plain(Key::KEY_F11),
        0xcd => plain(Key::KEY_F12),
        0xd1 => plain(Key::KEY_INSERT),
        0xd2 => plain(Key::KEY_HOME),
        0xd3 => plain(Key::KEY_PAGEUP),
        0xd4 => plain(Key::KEY_DELETE),
        0xd5 => plain(Key::KEY_END),
        0xd6 => plain(Key::KEY_PAGEDOWN),
        0xd7 => plain(Key::KEY_RIGHT),
        0xd8 => plain(Key::KEY_LEFT),
        0xd9 => plain(Key::KEY_DOWN),
        0xda => plain(Key::KEY_UP),

        _ => None,
    }
}

/// Translate a HID consumer page usage to a keycode.
pub fn consumer_key(usage: u16) -> Option<Key> {
    match usage {
        0x0030 => Some(Key::KEY_POWER),
        0x00b5 => Some(Key::KEY_NEXTSONG),
        0x00b6 => Some(Key::KEY_PREVIOUSSONG),
        0x00b7 => Some(Key::KEY_STOPCD),
        0x00b8 => Some(Key::KEY_EJECTCD),
        0x00cd => Some(Key::KEY_PLAYPAUSE),
        0x00e2 => Some(Key::KEY_MUTE),
        0x00e9 => Some(Key::KEY_VOLUMEUP),
        0x00ea => Some(Key::KEY_VOLUMEDOWN),
        0x0223 => Some(Key::KEY_HOMEPAGE),
        0x0224 => Some(Key::KEY_BACK),
        _ => None,
    }
}

pub struct UinputHid {
    device: VirtualDevice,
    down: Vec<Key>,
    consumer_down: Option<Key>,
}

impl UinputHid {
    /// Create the virtual device. Only keycodes reachable from the mapping
    /// tables are advertised to the host.
    pub fn open(
        keys: impl Iterator<Item = u8>,
        usages: impl Iterator<Item = u16>,
    ) -> io::Result<UinputHid> {
        let mut set = AttributeSet::<Key>::new();
        let mut shift = false;

        for key in keys {
            if let Some((key, shifted)) = keyboard_key(key) {
                set.insert(key);
                shift |= shifted;
            } else {
                debug!("no keycode for key 0x{key:02x}");
            }
        }

        if shift {
            set.insert(Key::KEY_LEFTSHIFT);
        }

        for usage in usages {
            if let Some(key) = consumer_key(usage) {
                set.insert(key);
            } else {
                debug!("no keycode for consumer usage 0x{usage:04x}");
            }
        }

        let device = VirtualDeviceBuilder::new()?
            .name("irhid remote")
            .with_keys(&set)?
            .build()?;

        Ok(UinputHid {
            device,
            down: Vec::new(),
            consumer_down: None,
        })
    }

    fn emit(&mut self, key: Key, value: i32) -> io::Result<()> {
        self.device
            .emit(&[InputEvent::new(EventType::KEY, key.code(), value)])
    }
}

impl HidSink for UinputHid {
    fn press_key(&mut self, key: u8) -> io::Result<()> {
        let Some((key, shift)) = keyboard_key(key) else {
            // like a lookup miss, a defined no-op
            debug!("no keycode for key 0x{key:02x}");
            return Ok(());
        };

        if shift {
            self.emit(Key::KEY_LEFTSHIFT, 1)?;
            self.down.push(Key::KEY_LEFTSHIFT);
        }

        self.emit(key, 1)?;
        self.down.push(key);

        Ok(())
    }

    fn release_all_keys(&mut self) -> io::Result<()> {
        // release in reverse press order so shift goes up last
        while let Some(key) = self.down.pop() {
            self.emit(key, 0)?;
        }

        Ok(())
    }

    fn press_consumer(&mut self, usage: u16) -> io::Result<()> {
        let Some(key) = consumer_key(usage) else {
            debug!("no keycode for consumer usage 0x{usage:04x}");
            return Ok(());
        };

        self.emit(key, 1)?;
        self.consumer_down = Some(key);

        Ok(())
    }

    fn release_consumer(&mut self) -> io::Result<()> {
        if let Some(key) = self.consumer_down.take() {
            self.emit(key, 0)?;
        }

        Ok(())
    }
}

#[test]
fn ascii_translation() {
    assert_eq!(keyboard_key(b'a'), Some((Key::KEY_A, false)));
    assert_eq!(keyboard_key(b'A'), Some((Key::KEY_A, true)));
    assert_eq!(keyboard_key(b'7'), Some((Key::KEY_7, false)));
    assert_eq!(keyboard_key(b'&'), Some((Key::KEY_7, true)));
    assert_eq!(keyboard_key(0xb0), Some((Key::KEY_ENTER, false)));
    assert_eq!(keyboard_key(0xcd), Some((Key::KEY_F12, false)));
    assert_eq!(keyboard_key(0x07), None);
}

#[test]
fn consumer_translation() {
    assert_eq!(consumer_key(0x00e9), Some(Key::KEY_VOLUMEUP));
    assert_eq!(consumer_key(0x00cd), Some(Key::KEY_PLAYPAUSE));
    assert_eq!(consumer_key(0x0001), None);
}
