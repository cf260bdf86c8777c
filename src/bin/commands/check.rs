use irhid::{config::Settings, maps, mode};
use itertools::Itertools;
use log::warn;
use std::path::Path;

/// Validate the settings file and show the configuration as it would be
/// used at startup, after defaults and table capacity are applied.
pub fn check(config: &Path) {
    let settings = Settings::load(config);

    println!("settings file: {}", config.display());
    println!("lirc device: {}", settings.ir.device.display());
    println!("mode change code: 0x{:08x}", settings.ir.mode_change_code);

    if settings.ir.handle_repeat {
        println!(
            "repeat handling: on, replay after {} repeat reports",
            settings.ir.repeat_delay_reports
        );
    } else {
        println!("repeat handling: off");
    }

    match &settings.led.device {
        Some(path) => println!("led device: {}", path.display()),
        None => println!("led device: none"),
    }

    println!(
        "keyboard mode color: 0x{:06x} (grb 0x{:06x} at {}% brightness)",
        settings.led.keyboard_color,
        mode::scaled_color(settings.led.keyboard_color, settings.led.brightness_percent),
        settings.led.brightness_percent
    );
    println!(
        "consumer mode color: 0x{:06x} (grb 0x{:06x} at {}% brightness)",
        settings.led.consumer_color,
        mode::scaled_color(settings.led.consumer_color, settings.led.brightness_percent),
        settings.led.brightness_percent
    );

    let keyboard = maps::build_table("keyboard", &settings.keyboard, settings.capacity);
    let consumer = maps::build_table("consumer", &settings.consumer, settings.capacity);

    println!(
        "mappings: {} keyboard, {} consumer (capacity {} each)",
        keyboard.len(),
        consumer.len(),
        settings.capacity
    );

    for (code, key) in keyboard.iter() {
        if key.is_ascii_graphic() {
            println!("keyboard 0x{code:08x} => 0x{key:02x} ‘{}’", *key as char);
        } else {
            println!("keyboard 0x{code:08x} => 0x{key:02x}");
        }
    }

    for (code, usage) in consumer.iter() {
        println!("consumer 0x{code:08x} => 0x{usage:04x}");
    }

    report_duplicates("keyboard", settings.keyboard.iter().map(|(code, _)| *code));
    report_duplicates("consumer", settings.consumer.iter().map(|(code, _)| *code));

    let mode_change = settings.ir.mode_change_code;

    if keyboard.lookup(mode_change).is_some() || consumer.lookup(mode_change).is_some() {
        warn!(
            "0x{mode_change:08x} is both the mode change code and a mapping, \
            the mapped action is unreachable; mode change always wins"
        );
    }
}

fn report_duplicates(name: &str, codes: impl Iterator<Item = u32>) {
    let duplicates = codes
        .duplicates()
        .map(|code| format!("0x{code:08x}"))
        .join(", ");

    if !duplicates.is_empty() {
        warn!("{name}: duplicate codes {duplicates}, the first entry wins");
    }
}
