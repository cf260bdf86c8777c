//! Per-frame dispatch
//!
//! One controller owns the tables, the repeat filter and the mode; every
//! decoded frame goes through it exactly once and ends in one of a handful
//! of outcomes. The HID and indicator collaborators sit behind traits so
//! the whole state machine runs in tests without hardware.

use crate::{
    config::Settings,
    maps::{self, CodeTable},
    mode::{Mode, ModeColors},
    repeat::{Frame, RepeatFilter},
};
use log::{debug, info};
use std::{io, thread, time::Duration};

/// Minimum time a press is held so the HID host registers it.
pub const KEY_HOLD: Duration = Duration::from_millis(50);

pub trait HidSink {
    fn press_key(&mut self, key: u8) -> io::Result<()>;
    fn release_all_keys(&mut self) -> io::Result<()>;
    fn press_consumer(&mut self, usage: u16) -> io::Result<()>;
    fn release_consumer(&mut self) -> io::Result<()>;
}

pub trait Indicator {
    /// The color arrives pre-scaled for brightness, packed in GRB order.
    fn set_color(&mut self, grb: u32) -> io::Result<()>;
}

/// How a frame was handled.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// Repeat frame inside the debounce window.
    Suppressed,
    ModeChanged(Mode),
    SentKey(u8),
    SentUsage(u16),
    /// Nothing mapped to this code in the active mode.
    NoMapping,
}

pub struct RemoteController {
    keyboard: CodeTable<u8>,
    consumer: CodeTable<u16>,
    repeat: RepeatFilter,
    mode: Mode,
    colors: ModeColors,
    mode_change_code: u32,
    hold: Duration,
}

impl RemoteController {
    pub fn new(settings: &Settings) -> Self {
        RemoteController {
            keyboard: maps::build_table("keyboard", &settings.keyboard, settings.capacity),
            consumer: maps::build_table("consumer", &settings.consumer, settings.capacity),
            repeat: RepeatFilter::new(
                settings.ir.handle_repeat,
                settings.ir.repeat_delay_reports,
            ),
            mode: Mode::Consumer,
            colors: ModeColors::from_rgb(
                settings.led.keyboard_color,
                settings.led.consumer_color,
                settings.led.brightness_percent,
            ),
            mode_change_code: settings.ir.mode_change_code,
            hold: KEY_HOLD,
        }
    }

    /// Override the minimum press duration.
    pub fn set_hold(&mut self, hold: Duration) {
        self.hold = hold;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn keyboard(&self) -> &CodeTable<u8> {
        &self.keyboard
    }

    pub fn consumer(&self) -> &CodeTable<u16> {
        &self.consumer
    }

    /// Push the current mode's color to the indicator. Runs once at startup
    /// and after every toggle; nothing else may touch the indicator.
    pub fn refresh_indicator(&self, indicator: &mut dyn Indicator) -> io::Result<()> {
        indicator.set_color(self.colors.color_for(self.mode))
    }

    /// Handle one decoded frame to completion. The press hold is a blocking
    /// wait; button presses are human-paced, so losing frame acquisition for
    /// that window is fine. The caller re-arms the receiver afterwards
    /// whatever the outcome.
    pub fn dispatch(
        &mut self,
        raw: u32,
        hid: &mut dyn HidSink,
        indicator: &mut dyn Indicator,
    ) -> io::Result<Outcome> {
        let code = match self.repeat.filter(raw) {
            Frame::Suppressed => return Ok(Outcome::Suppressed),
            Frame::Code(code) => code,
        };

        // checked before lookup: a colliding mapping can never shadow the
        // mode change button
        if code == self.mode_change_code {
            self.mode = self.mode.toggle();
            self.refresh_indicator(indicator)?;
            info!("mode switched: {}", self.mode.label());

            return Ok(Outcome::ModeChanged(self.mode));
        }

        match self.mode {
            Mode::Consumer => {
                let Some(usage) = self.consumer.lookup(code) else {
                    debug!("no consumer mapping for 0x{code:08x}");
                    return Ok(Outcome::NoMapping);
                };

                hid.press_consumer(usage)?;
                thread::sleep(self.hold);
                hid.release_consumer()?;

                Ok(Outcome::SentUsage(usage))
            }
            Mode::Keyboard => {
                let Some(key) = self.keyboard.lookup(code) else {
                    debug!("no keyboard mapping for 0x{code:08x}");
                    return Ok(Outcome::NoMapping);
                };

                hid.press_key(key)?;
                thread::sleep(self.hold);
                hid.release_all_keys()?;

                Ok(Outcome::SentKey(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repeat::REPEAT_SENTINEL;
    use pretty_assertions::assert_eq;

    #[derive(PartialEq, Eq, Debug)]
    enum Call {
        Key(u8),
        ReleaseAll,
        Usage(u16),
        ReleaseConsumer,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl HidSink for Recorder {
        fn press_key(&mut self, key: u8) -> io::Result<()> {
            self.calls.push(Call::Key(key));
            Ok(())
        }

        fn release_all_keys(&mut self) -> io::Result<()> {
            self.calls.push(Call::ReleaseAll);
            Ok(())
        }

        fn press_consumer(&mut self, usage: u16) -> io::Result<()> {
            self.calls.push(Call::Usage(usage));
            Ok(())
        }

        fn release_consumer(&mut self) -> io::Result<()> {
            self.calls.push(Call::ReleaseConsumer);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Lamp {
        colors: Vec<u32>,
    }

    impl Indicator for Lamp {
        fn set_color(&mut self, grb: u32) -> io::Result<()> {
            self.colors.push(grb);
            Ok(())
        }
    }

    fn controller() -> RemoteController {
        let mut settings = Settings::default();

        settings.ir.mode_change_code = 0x1000_0001;
        settings.keyboard = vec![(0xabcd_0001, b'a'), (0xabcd_0002, 0xb0)];
        settings.consumer = vec![(0xabcd_1234, 0x00e9), (0xabcd_0003, 0x00cd)];

        let mut controller = RemoteController::new(&settings);
        controller.set_hold(Duration::ZERO);
        controller
    }

    #[test]
    fn volume_up_end_to_end() {
        let mut controller = controller();
        let mut hid = Recorder::default();
        let mut lamp = Lamp::default();

        // boots in consumer mode
        assert_eq!(controller.mode(), Mode::Consumer);

        let outcome = controller
            .dispatch(0xabcd_1234, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::SentUsage(0x00e9));
        assert_eq!(hid.calls, vec![Call::Usage(0x00e9), Call::ReleaseConsumer]);
        assert_eq!(controller.mode(), Mode::Consumer);
        assert!(lamp.colors.is_empty());
    }

    #[test]
    fn unmapped_code_is_a_no_op() {
        let mut controller = controller();
        let mut hid = Recorder::default();
        let mut lamp = Lamp::default();

        let outcome = controller
            .dispatch(0x5555_5555, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::NoMapping);
        assert!(hid.calls.is_empty());
        assert!(lamp.colors.is_empty());
    }

    #[test]
    fn keyboard_key_after_mode_switch() {
        let mut controller = controller();
        let mut hid = Recorder::default();
        let mut lamp = Lamp::default();

        let outcome = controller
            .dispatch(0x1000_0001, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::ModeChanged(Mode::Keyboard));
        assert_eq!(lamp.colors.len(), 1);

        let outcome = controller
            .dispatch(0xabcd_0001, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::SentKey(b'a'));
        assert_eq!(hid.calls, vec![Call::Key(b'a'), Call::ReleaseAll]);

        // consumer mappings are not consulted in keyboard mode
        let outcome = controller
            .dispatch(0xabcd_1234, &mut hid, &mut lamp)
            .unwrap();
        assert_eq!(outcome, Outcome::NoMapping);
    }

    #[test]
    fn mode_change_wins_over_colliding_mapping() {
        let mut settings = Settings::default();

        settings.ir.mode_change_code = 0xabcd_1234;
        settings.consumer = vec![(0xabcd_1234, 0x00e9)];

        let mut controller = RemoteController::new(&settings);
        controller.set_hold(Duration::ZERO);

        let mut hid = Recorder::default();
        let mut lamp = Lamp::default();

        let outcome = controller
            .dispatch(0xabcd_1234, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::ModeChanged(Mode::Keyboard));
        assert!(hid.calls.is_empty());
        assert_eq!(lamp.colors.len(), 1);
    }

    #[test]
    fn repeat_suppression_then_replay() {
        let mut controller = controller();
        let mut hid = Recorder::default();
        let mut lamp = Lamp::default();

        controller
            .dispatch(0xabcd_1234, &mut hid, &mut lamp)
            .unwrap();

        for _ in 0..5 {
            let outcome = controller
                .dispatch(REPEAT_SENTINEL, &mut hid, &mut lamp)
                .unwrap();
            assert_eq!(outcome, Outcome::Suppressed);
        }

        // one press so far
        assert_eq!(hid.calls.len(), 2);

        let outcome = controller
            .dispatch(REPEAT_SENTINEL, &mut hid, &mut lamp)
            .unwrap();

        assert_eq!(outcome, Outcome::SentUsage(0x00e9));
        assert_eq!(hid.calls.len(), 4);
    }

    #[test]
    fn startup_refresh_uses_consumer_color() {
        let controller = controller();
        let mut lamp = Lamp::default();

        controller.refresh_indicator(&mut lamp).unwrap();

        assert_eq!(
            lamp.colors,
            vec![crate::mode::scaled_color(
                crate::config::DEFAULT_CONSUMER_MODE_COLOR,
                crate::config::DEFAULT_LED_BRIGHTNESS_PERCENT
            )]
        );
    }
}
