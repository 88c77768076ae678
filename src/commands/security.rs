//! Lock state command handlers.

use pikbd_keyboard::{Capability, Hsv, UNLOCK_TIMEOUT};
use pikbd_transport::PrinterConfig;

use super::{open_keyboard, CommandResult};
use crate::keycodes;

/// Run the unlock handshake, prompting for the unlock keys
///
/// On RGB-capable hardware the unlock keys light up white while the
/// firmware counts down.
pub async fn unlock(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;

    let status = keyboard.unlock_status().await?;
    if status.unlocked {
        println!("Keyboard is already unlocked");
        keyboard.close().await?;
        return Ok(());
    }

    println!("Press and hold the unlock keys until the counter reaches 0.");
    println!("The unlock keys are:");
    for &(row, col) in &status.keys {
        let keycode = keyboard.keycode(0, row, col).await?;
        println!(
            "    Row: {row}, Col: {col} -> Keycode on layer 0: {}",
            keycodes::keycode_name(keycode)
        );
    }

    let use_leds = keyboard.capabilities().supports(Capability::Lighting);
    if use_leds {
        keyboard.clear_leds().await?;
        for &(row, col) in &status.keys {
            keyboard.set_led_by_matrix(row, col, Hsv::new(0, 0, 255))?;
        }
        keyboard.send_leds().await?;
    }

    let mut last_counter = None;
    let result = keyboard
        .unlock_with(UNLOCK_TIMEOUT, |poll| {
            if last_counter != Some(poll.counter) {
                println!("Unlock counter: {}", poll.counter);
                last_counter = Some(poll.counter);
            }
        })
        .await;

    if use_leds {
        keyboard.revert_to_saved_preset().await?;
    }
    result?;

    println!("Keyboard unlocked");
    keyboard.close().await?;
    Ok(())
}

/// Re-lock the keyboard
pub async fn lock(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.lock().await?;
    println!("Keyboard locked");
    keyboard.close().await?;
    Ok(())
}
