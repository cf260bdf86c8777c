//! Operating mode and indicator color

/// Which HID personality mapped buttons drive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Keyboard,
    Consumer,
}

impl Mode {
    pub fn toggle(self) -> Mode {
        match self {
            Mode::Keyboard => Mode::Consumer,
            Mode::Consumer => Mode::Keyboard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Keyboard => "keyboard",
            Mode::Consumer => "consumer/media",
        }
    }
}

/// Indicator colors for both modes, already scaled for brightness and packed
/// for the indicator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ModeColors {
    keyboard: u32,
    consumer: u32,
}

impl ModeColors {
    pub fn from_rgb(keyboard: u32, consumer: u32, brightness_percent: u8) -> Self {
        ModeColors {
            keyboard: scaled_color(keyboard, brightness_percent),
            consumer: scaled_color(consumer, brightness_percent),
        }
    }

    pub fn color_for(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Keyboard => self.keyboard,
            Mode::Consumer => self.consumer,
        }
    }
}

/// Scale an 0xRRGGBB color by a brightness percentage, each channel
/// independently, and pack the result in the GRB order the indicator expects
/// (green in the most significant of the three color bytes).
pub fn scaled_color(rgb: u32, brightness_percent: u8) -> u32 {
    let scale = |channel: u32| (channel & 0xff) * u32::from(brightness_percent) / 100;

    let r = scale(rgb >> 16);
    let g = scale(rgb >> 8);
    let b = scale(rgb);

    (g << 16) | (r << 8) | b
}

#[test]
fn toggle_is_an_involution() {
    assert_eq!(Mode::Keyboard.toggle().toggle(), Mode::Keyboard);
    assert_eq!(Mode::Consumer.toggle().toggle(), Mode::Consumer);
    assert_eq!(Mode::Consumer.toggle(), Mode::Keyboard);
}

#[test]
fn color_scaling() {
    // floor(255 * 10 / 100) = 25 on every channel
    assert_eq!(scaled_color(0xffffff, 10), 0x191919);

    // full brightness only swaps red and green
    assert_eq!(scaled_color(0x010203, 100), 0x020103);

    assert_eq!(scaled_color(0xffffff, 0), 0);
}

#[test]
fn color_for_is_a_pure_lookup() {
    let colors = ModeColors::from_rgb(0x290118, 0x012329, 10);

    assert_eq!(colors.color_for(Mode::Keyboard), scaled_color(0x290118, 10));
    assert_eq!(colors.color_for(Mode::Consumer), scaled_color(0x012329, 10));
}
