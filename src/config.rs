//! Settings file parsing
//!
//! The settings document is TOML with an `[ir]` section, an `[led]` section
//! and two mapping arrays, `[[keyboard]]` and `[[consumer]]`. Every field is
//! optional: parsing yields a raw document which is then merged over the
//! compiled-in defaults in one explicit step, so a missing or broken file
//! never prevents startup.

use log::warn;
use serde_derive::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_SETTINGS_FILE: &str = "/etc/irhid.toml";

// Defaults mirror the reference remote this was built for.
pub const DEFAULT_LIRC_DEVICE: &str = "/dev/lirc0";
pub const DEFAULT_MODE_CHANGE_CODE: u32 = 0xc403_87ee;
pub const DEFAULT_HANDLE_REPEAT: bool = true;
pub const DEFAULT_REPEAT_DELAY_REPORTS: u8 = 5;
pub const DEFAULT_KEYBOARD_MODE_COLOR: u32 = 0x29_0118;
pub const DEFAULT_CONSUMER_MODE_COLOR: u32 = 0x01_2329;
pub const DEFAULT_LED_BRIGHTNESS_PERCENT: u8 = 10;
pub const DEFAULT_MAX_MAPPINGS: usize = 20;

#[derive(Deserialize, Default)]
struct RawSettings {
    ir: Option<RawIr>,
    led: Option<RawLed>,
    max_mappings: Option<usize>,
    keyboard: Option<Vec<RawKeyboard>>,
    consumer: Option<Vec<RawConsumer>>,
}

#[derive(Deserialize)]
struct RawIr {
    device: Option<PathBuf>,
    mode_change_code: Option<String>,
    handle_repeat: Option<bool>,
    repeat_delay_reports: Option<u8>,
}

#[derive(Deserialize)]
struct RawLed {
    device: Option<PathBuf>,
    brightness_percent: Option<u8>,
    keyboard_mode_color: Option<String>,
    consumer_mode_color: Option<String>,
}

#[derive(Deserialize)]
struct RawKeyboard {
    code: String,
    key: Action,
}

#[derive(Deserialize)]
struct RawConsumer {
    code: String,
    usage: Action,
}

/// A mapped action is either a plain integer or a string: hex like "0x2a",
/// decimal, or (for keyboard entries) a single printable character.
#[derive(Deserialize)]
#[serde(untagged)]
enum Action {
    Number(u32),
    Text(String),
}

/// Fully-typed, fully-defaulted configuration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Settings {
    pub ir: IrSettings,
    pub led: LedSettings,
    /// Table capacity; entries beyond it are dropped at boot.
    pub capacity: usize,
    pub keyboard: Vec<(u32, u8)>,
    pub consumer: Vec<(u32, u16)>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IrSettings {
    pub device: PathBuf,
    pub mode_change_code: u32,
    pub handle_repeat: bool,
    pub repeat_delay_reports: u8,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LedSettings {
    /// Multicolor LED class directory; no indicator when absent.
    pub device: Option<PathBuf>,
    pub brightness_percent: u8,
    pub keyboard_color: u32,
    pub consumer_color: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ir: IrSettings {
                device: PathBuf::from(DEFAULT_LIRC_DEVICE),
                mode_change_code: DEFAULT_MODE_CHANGE_CODE,
                handle_repeat: DEFAULT_HANDLE_REPEAT,
                repeat_delay_reports: DEFAULT_REPEAT_DELAY_REPORTS,
            },
            led: LedSettings {
                device: None,
                brightness_percent: DEFAULT_LED_BRIGHTNESS_PERCENT,
                keyboard_color: DEFAULT_KEYBOARD_MODE_COLOR,
                consumer_color: DEFAULT_CONSUMER_MODE_COLOR,
            },
            capacity: DEFAULT_MAX_MAPPINGS,
            keyboard: Vec::new(),
            consumer: Vec::new(),
        }
    }
}

impl Settings {
    /// Read and merge the settings file. A missing or malformed file warns
    /// and falls back to the defaults; this never fails.
    pub fn load(path: &Path) -> Settings {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("{}: {e}, using defaults", path.display());
                return Settings::default();
            }
        };

        match Settings::parse(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}: {e}, using defaults", path.display());
                Settings::default()
            }
        }
    }

    /// Parse a settings document and merge it over the defaults. Individual
    /// bad fields warn and keep their default; bad mapping entries warn and
    /// are dropped.
    pub fn parse(contents: &str) -> Result<Settings, String> {
        let raw: RawSettings = toml::from_str(contents).map_err(|e| e.to_string())?;

        Ok(merge(raw))
    }
}

fn merge(raw: RawSettings) -> Settings {
    let mut settings = Settings::default();

    if let Some(ir) = raw.ir {
        if let Some(device) = ir.device {
            settings.ir.device = device;
        }

        if let Some(code) = &ir.mode_change_code {
            match parse_hex(code) {
                Ok(code) => settings.ir.mode_change_code = code,
                Err(e) => warn!("ir.mode_change_code: {e}"),
            }
        }

        if let Some(handle_repeat) = ir.handle_repeat {
            settings.ir.handle_repeat = handle_repeat;
        }

        if let Some(reports) = ir.repeat_delay_reports {
            settings.ir.repeat_delay_reports = reports;
        }
    }

    if let Some(led) = raw.led {
        settings.led.device = led.device;

        if let Some(brightness) = led.brightness_percent {
            if brightness <= 100 {
                settings.led.brightness_percent = brightness;
            } else {
                warn!(
                    "led.brightness_percent: {brightness} is over 100, using {}",
                    settings.led.brightness_percent
                );
            }
        }

        if let Some(color) = &led.keyboard_mode_color {
            match parse_hex(color) {
                Ok(color) => settings.led.keyboard_color = color,
                Err(e) => warn!("led.keyboard_mode_color: {e}"),
            }
        }

        if let Some(color) = &led.consumer_mode_color {
            match parse_hex(color) {
                Ok(color) => settings.led.consumer_color = color,
                Err(e) => warn!("led.consumer_mode_color: {e}"),
            }
        }
    }

    if let Some(capacity) = raw.max_mappings {
        settings.capacity = capacity;
    }

    for entry in raw.keyboard.unwrap_or_default() {
        match keyboard_entry(&entry) {
            Ok(mapping) => settings.keyboard.push(mapping),
            Err(e) => warn!("keyboard: {e}"),
        }
    }

    for entry in raw.consumer.unwrap_or_default() {
        match consumer_entry(&entry) {
            Ok(mapping) => settings.consumer.push(mapping),
            Err(e) => warn!("consumer: {e}"),
        }
    }

    settings
}

/// Parse a hex string, with or without an 0x prefix.
fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    u32::from_str_radix(digits, 16).map_err(|_| format!("‘{s}’ is not a hex number"))
}

fn keyboard_entry(entry: &RawKeyboard) -> Result<(u32, u8), String> {
    let code = parse_hex(&entry.code)?;

    let key = match &entry.key {
        Action::Number(n) => {
            u8::try_from(*n).map_err(|_| format!("key {n} does not fit in 8 bits"))?
        }
        Action::Text(s) => parse_key(s)?,
    };

    Ok((code, key))
}

/// A keyboard key is a single printable character (sent as its ASCII value),
/// a hex string like "0x2a", or a decimal string.
fn parse_key(s: &str) -> Result<u8, String> {
    let mut chars = s.chars();

    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii() {
            return Ok(ch as u8);
        }

        return Err(format!("‘{s}’ is not an ASCII key"));
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_| format!("‘{s}’ is not a valid key"));
    }

    s.parse().map_err(|_| format!("‘{s}’ is not a valid key"))
}

fn consumer_entry(entry: &RawConsumer) -> Result<(u32, u16), String> {
    let code = parse_hex(&entry.code)?;

    let usage = match &entry.usage {
        Action::Number(n) => *n,
        Action::Text(s) => parse_hex(s)?,
    };

    let usage =
        u16::try_from(usage).map_err(|_| format!("usage {usage:#x} does not fit in 16 bits"))?;

    // 0 can never match a lookup, so reject it loudly instead
    if usage == 0 {
        return Err(format!("0x{code:08x}: usage 0 is reserved, entry dropped"));
    }

    Ok((code, usage))
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn parse_full_document() {
    let s = r#"
    max_mappings = 30

    [ir]
    device = "/dev/lirc1"
    mode_change_code = "0x40BF08F7"
    handle_repeat = false
    repeat_delay_reports = 3

    [led]
    device = "/sys/class/leds/rgb:status"
    brightness_percent = 60
    keyboard_mode_color = "ff0000"
    consumer_mode_color = "0x00ff00"

    [[keyboard]]
    code = "0x40BF12ED"
    key = "a"

    [[keyboard]]
    code = "40BF13EC"
    key = "0x2a"

    [[keyboard]]
    code = "0x40BF14EB"
    key = 66

    [[keyboard]]
    code = "0x40BF15EA"
    key = "177"

    [[consumer]]
    code = "0x40BF16E9"
    usage = "0xE9"

    [[consumer]]
    code = "0x40BF17E8"
    usage = 205
    "#;

    let settings = Settings::parse(s).unwrap();

    assert_eq!(settings.ir.device, PathBuf::from("/dev/lirc1"));
    assert_eq!(settings.ir.mode_change_code, 0x40bf08f7);
    assert!(!settings.ir.handle_repeat);
    assert_eq!(settings.ir.repeat_delay_reports, 3);
    assert_eq!(settings.capacity, 30);

    assert_eq!(
        settings.led.device,
        Some(PathBuf::from("/sys/class/leds/rgb:status"))
    );
    assert_eq!(settings.led.brightness_percent, 60);
    assert_eq!(settings.led.keyboard_color, 0xff0000);
    assert_eq!(settings.led.consumer_color, 0x00ff00);

    assert_eq!(
        settings.keyboard,
        vec![
            (0x40bf12ed, b'a'),
            (0x40bf13ec, 0x2a),
            (0x40bf14eb, 66),
            (0x40bf15ea, 177),
        ]
    );
    assert_eq!(settings.consumer, vec![(0x40bf16e9, 0xe9), (0x40bf17e8, 0xcd)]);
}

#[test]
fn missing_sections_keep_defaults() {
    let settings = Settings::parse("").unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.ir.mode_change_code, DEFAULT_MODE_CHANGE_CODE);
    assert_eq!(settings.led.brightness_percent, DEFAULT_LED_BRIGHTNESS_PERCENT);
    assert_eq!(settings.capacity, DEFAULT_MAX_MAPPINGS);
}

#[test]
fn malformed_document_is_an_error() {
    assert!(Settings::parse("[ir").is_err());

    // load falls back to defaults rather than failing
    let settings = Settings::load(Path::new("/nonexistent/irhid.toml"));
    assert_eq!(settings, Settings::default());
}

#[test]
fn bad_fields_fall_back_per_field() {
    let s = r#"
    [ir]
    mode_change_code = "not hex"
    repeat_delay_reports = 9

    [led]
    brightness_percent = 150
    "#;

    let settings = Settings::parse(s).unwrap();

    assert_eq!(settings.ir.mode_change_code, DEFAULT_MODE_CHANGE_CODE);
    assert_eq!(settings.ir.repeat_delay_reports, 9);
    assert_eq!(settings.led.brightness_percent, DEFAULT_LED_BRIGHTNESS_PERCENT);
}

#[test]
fn reserved_and_oversized_entries_are_dropped() {
    let s = r#"
    [[consumer]]
    code = "0x01"
    usage = "0x0"

    [[consumer]]
    code = "0x02"
    usage = 65536

    [[consumer]]
    code = "0x03"
    usage = "0xEA"

    [[keyboard]]
    code = "0x04"
    key = 300
    "#;

    let settings = Settings::parse(s).unwrap();

    assert_eq!(settings.consumer, vec![(3, 0xea)]);
    assert!(settings.keyboard.is_empty());
}
