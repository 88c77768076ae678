//! Query (read-only) command handlers.

use pikbd_keyboard::SecurityState;
use pikbd_transport::PrinterConfig;

use super::{open_keyboard, CommandResult};
use crate::keycodes;

/// Show model, firmware and lock status
pub async fn info(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let identity = keyboard.identity();

    println!("Keyboard Model: {}", identity.model);
    if let Some(variant) = identity.variant {
        println!("Keyboard Variant: {variant}");
    }
    println!("Firmware Version: {}", identity.firmware);
    println!(
        "Protocols: Via {} / Vial {} / VialRGB {}",
        identity.via_protocol,
        identity.vial_protocol,
        if identity.vialrgb { "yes" } else { "no" }
    );

    let uptime = keyboard.uptime().await?;
    println!("Uptime: {} seconds", uptime.as_secs());

    let status = keyboard.unlock_status().await?;
    println!("Keyboard unlock keys:");
    for &(row, col) in &status.keys {
        let keycode = keyboard.keycode(0, row, col).await?;
        println!(
            "    Row: {row}, Col: {col} -> Keycode on layer 0: {}",
            keycodes::keycode_name(keycode)
        );
    }
    match status.state() {
        SecurityState::Unlocked => println!("Keyboard is unlocked."),
        SecurityState::Unlocking => println!(
            "Keyboard is currently in unlock process. \
             Complete the unlock or power cycle the keyboard."
        ),
        SecurityState::Locked => println!("Keyboard is locked."),
    }

    keyboard.close().await?;
    Ok(())
}

/// Show the vendor firmware version
pub async fn version(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    println!("Keyboard version: {}", keyboard.firmware_version());
    keyboard.close().await?;
    Ok(())
}

/// Show time since the keyboard booted
pub async fn uptime(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let uptime = keyboard.uptime().await?;
    println!("Uptime: {:.1} seconds", uptime.as_secs_f64());
    keyboard.close().await?;
    Ok(())
}

/// List the RGB effects the firmware supports
pub async fn list_effects(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let mut effects = keyboard.supported_effects().await?;
    effects.sort_unstable();

    println!("Supported RGB Effects:");
    for id in &effects {
        match pikbd_keyboard::effects::effect_name(*id) {
            Some(name) => println!("  ID {id:2}: {name}"),
            None => println!("  ID {id:2}: (no name)"),
        }
    }
    println!("\nTotal effects supported: {}", effects.len());
    println!("\nYou can use either the ID number or any of the names listed above.");

    keyboard.close().await?;
    Ok(())
}

/// List QMK keycode names; no device needed
pub fn list_keycodes(filter: Option<&str>) -> CommandResult {
    print!("{}", keycodes::format_keycode_listing(filter));
    Ok(())
}
