//! Keymap command handlers: read, bind and watch keys.

use std::time::Duration;

use anyhow::bail;
use pikbd_keyboard::effects::EFFECT_DIRECT;
use pikbd_keyboard::keymap::LAYER_COUNT;
use pikbd_keyboard::{Capability, Hsv, Keyboard};
use pikbd_transport::PrinterConfig;

use super::{open_keyboard, CommandResult};
use crate::keycodes;

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(10);

const WHITE: Hsv = Hsv::new(0, 0, 255);

/// Restore the firmware's default keymap
pub async fn reset_keymap(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.reset_keymap().await?;
    println!("Keyboard keymap reset");
    keyboard.close().await?;
    Ok(())
}

/// Show the keycode bound at a matrix position
pub async fn key_get(
    printer_config: Option<PrinterConfig>,
    row: u8,
    col: u8,
    layer: u8,
) -> CommandResult {
    check_layer(layer)?;
    let keyboard = open_keyboard(printer_config).await?;

    let keycode = keyboard.keycode(layer, row, col).await?;
    println!("Key at row {row}, col {col}, layer {layer}:");
    println!("  Keycode: {keycode} (0x{keycode:04X})");
    println!("  QMK Name: {}", keycodes::keycode_name(keycode));

    keyboard.close().await?;
    Ok(())
}

/// Bind a keycode at a matrix position
pub async fn key_set(
    printer_config: Option<PrinterConfig>,
    row: u8,
    col: u8,
    input: &str,
    layer: u8,
) -> CommandResult {
    check_layer(layer)?;
    let keycode = keycodes::parse_keycode(input)?;
    let keyboard = open_keyboard(printer_config).await?;

    keyboard.set_keycode(layer, row, col, keycode).await?;
    println!("Key at row {row}, col {col}, layer {layer} set successfully:");
    println!("  Input: {input}");
    println!("  Keycode: {keycode} (0x{keycode:04X})");
    println!("  QMK Name: {}", keycodes::keycode_name(keycode));

    keyboard.close().await?;
    Ok(())
}

/// List every bound key on a layer
pub async fn key_get_all(
    printer_config: Option<PrinterConfig>,
    layer: u8,
    json: bool,
) -> CommandResult {
    check_layer(layer)?;
    let keyboard = open_keyboard(printer_config).await?;

    let bindings = keyboard.all_keycodes(layer).await?;
    if json {
        let entries: Vec<serde_json::Value> = bindings
            .iter()
            .map(|binding| {
                serde_json::json!({
                    "layer": binding.layer,
                    "row": binding.row,
                    "col": binding.col,
                    "keycode": binding.keycode,
                    "name": keycodes::keycode_name(binding.keycode),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for binding in &bindings {
            println!(
                "Key at row {:2}, col {:2}:  Keycode: {:5} (0x{:04X}) -> {}",
                binding.row,
                binding.col,
                binding.keycode,
                binding.keycode,
                keycodes::keycode_name(binding.keycode)
            );
        }
    }

    keyboard.close().await?;
    Ok(())
}

/// Print key presses and releases as they happen
pub async fn key_watch(
    printer_config: Option<PrinterConfig>,
    layer: u8,
    exit_key: &str,
    no_leds: bool,
) -> CommandResult {
    check_layer(layer)?;
    let exit_keycode = keycodes::parse_keycode(exit_key)?;

    let keyboard = open_keyboard(printer_config).await?;

    let status = keyboard.unlock_status().await?;
    if !status.unlocked {
        if status.in_progress {
            bail!("an unlock is already in progress; finish it or power-cycle the keyboard");
        }
        bail!("the keyboard is locked; run 'pikbd unlock' first");
    }

    let mut use_leds = !no_leds;
    if use_leds && !keyboard.capabilities().supports(Capability::Lighting) {
        println!("This keyboard has no per-key lighting; key feedback disabled");
        use_leds = false;
    }

    println!("Key press monitor started");
    println!("Layer: {layer}");
    println!("Exit key: {exit_key} (keycode {exit_keycode})");
    if use_leds {
        println!("LED feedback: enabled (use --no-leds to disable)");
        if keyboard.current_effect().await?.effect != EFFECT_DIRECT {
            keyboard.set_led_direct_effect().await?;
        }
        keyboard.clear_leds().await?;
    } else {
        println!("LED feedback: disabled");
    }
    println!("Press Ctrl+C or the exit key to stop...");
    println!();

    let result = watch_loop(&keyboard, layer, exit_keycode, use_leds).await;

    // The same cleanup runs whether the loop ended by exit key, Ctrl+C
    // or an error.
    if use_leds {
        keyboard.clear_leds().await?;
        keyboard.revert_to_saved_preset().await?;
    }
    println!("Key monitor stopped");
    result?;

    keyboard.close().await?;
    Ok(())
}

async fn watch_loop(
    keyboard: &Keyboard,
    layer: u8,
    exit_keycode: u16,
    use_leds: bool,
) -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut previous: Vec<(u8, u8)> = Vec::new();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println!("Stopping key monitor...");
                return Ok(());
            }
            _ = tokio::time::sleep(WATCH_POLL_INTERVAL) => {}
        }

        let active = keyboard.switch_matrix_state().await?;
        let mut changed = false;

        for &(row, col) in active.iter().filter(|pos| !previous.contains(pos)) {
            let keycode = keyboard.keycode(layer, row, col).await?;
            let name = keycodes::keycode_name(keycode);
            println!(
                "PRESS   Row {row:2}, Col {col:2} -> Keycode: {keycode:5} (0x{keycode:04X}) -> {name}"
            );
            if keycode == exit_keycode {
                println!("Exit key ({name}) pressed. Stopping...");
                return Ok(());
            }
            // Not every switch position has an LED behind it
            if use_leds && keyboard.set_led_by_matrix(row, col, WHITE).is_ok() {
                changed = true;
            }
        }

        for &(row, col) in previous.iter().filter(|pos| !active.contains(pos)) {
            let keycode = keyboard.keycode(layer, row, col).await?;
            let name = keycodes::keycode_name(keycode);
            println!(
                "RELEASE Row {row:2}, Col {col:2} -> Keycode: {keycode:5} (0x{keycode:04X}) -> {name}"
            );
            if use_leds && keyboard.set_led_by_matrix(row, col, Hsv::OFF).is_ok() {
                changed = true;
            }
        }

        if changed {
            keyboard.send_leds().await?;
        }
        previous = active;
    }
}

fn check_layer(layer: u8) -> anyhow::Result<()> {
    if layer >= LAYER_COUNT {
        bail!("layer must be between 0 and {}", LAYER_COUNT - 1);
    }
    Ok(())
}
