//! LED, effect and preset command handlers.

use anyhow::{anyhow, bail, Context};
use pikbd_keyboard::effects::{self, EFFECT_DIRECT, EFFECT_OFF, EFFECT_SKIP};
use pikbd_keyboard::{
    Keyboard, Preset, PresetUpdate, StartupAnimation, LAST_CYCLABLE_SLOT, TEMP_PRESET_SLOT,
};
use pikbd_transport::PrinterConfig;

use super::{open_keyboard, CommandResult};
use crate::color::parse_colour;

// === All LEDs ===

/// Turn every LED off
pub async fn leds_clear(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.clear_leds().await?;
    println!("All LEDs cleared");
    keyboard.close().await?;
    Ok(())
}

/// Set every LED to one colour
pub async fn leds_set(printer_config: Option<PrinterConfig>, colour: &str) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let hsv = parse_colour(colour)?;

    let count = keyboard.led_map().len();
    for index in 0..count {
        keyboard.set_led_by_index(index as u16, hsv)?;
    }
    keyboard.send_leds().await?;
    println!(
        "All {count} LEDs set to colour: {colour} -> HSV({}, {}, {})",
        hsv.h, hsv.s, hsv.v
    );

    keyboard.close().await?;
    Ok(())
}

/// Show the live or EEPROM direct-LED colours
pub async fn leds_get(printer_config: Option<PrinterConfig>, saved: bool) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let colors = if saved {
        keyboard.saved_direct_leds().await?
    } else {
        keyboard.current_direct_leds().await?
    };

    for (info, hsv) in keyboard.led_map().iter().zip(&colors) {
        match info.matrix {
            Some((row, col)) => println!(
                "LED {:2}: matrix=[{row}, {col:2}], HSV=({:3}, {:3}, {:3})",
                info.index, hsv.h, hsv.s, hsv.v
            ),
            None => println!(
                "LED {:2}: matrix=[-,  -], HSV=({:3}, {:3}, {:3})",
                info.index, hsv.h, hsv.s, hsv.v
            ),
        }
    }

    keyboard.close().await?;
    Ok(())
}

/// Persist the live direct-LED colours to EEPROM
pub async fn leds_save(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.save_direct_leds().await?;
    println!("Current direct LEDs saved to EEPROM");
    keyboard.close().await?;
    Ok(())
}

/// Restore the direct-LED colours from EEPROM
pub async fn leds_load(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.load_direct_leds().await?;
    println!("Saved direct LEDs loaded from EEPROM");
    keyboard.close().await?;
    Ok(())
}

// === Single LED ===

/// Set one LED by index or matrix position
pub async fn led_set(
    printer_config: Option<PrinterConfig>,
    position: &str,
    colour: &str,
) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    let hsv = parse_colour(colour)?;

    // A single flush leaves the shown effect alone, so the switch to the
    // direct effect has to happen here.
    if keyboard.current_effect().await?.effect != EFFECT_DIRECT {
        keyboard.set_led_direct_effect().await?;
    }

    if let Some((row_str, col_str)) = position.split_once(',') {
        let row: u8 = row_str
            .trim()
            .parse()
            .with_context(|| format!("invalid matrix row {:?}", row_str.trim()))?;
        let col: u8 = col_str
            .trim()
            .parse()
            .with_context(|| format!("invalid matrix column {:?}", col_str.trim()))?;

        let index = keyboard
            .led_map()
            .iter()
            .find(|info| info.matrix == Some((row, col)))
            .map(|info| info.index)
            .ok_or_else(|| anyhow!("no LED at matrix position {row},{col}"))?;
        keyboard.set_led_by_index(index, hsv)?;
        keyboard.send_led_by_index(index).await?;
        println!(
            "LED at matrix position [{row}, {col}] set to colour: {colour} -> HSV({}, {}, {})",
            hsv.h, hsv.s, hsv.v
        );
    } else {
        let index: u16 = position
            .trim()
            .parse()
            .with_context(|| format!("invalid LED index {position:?}"))?;
        keyboard.set_led_by_index(index, hsv)?;
        keyboard.send_led_by_index(index).await?;
        println!(
            "LED {index} set to colour: {colour} -> HSV({}, {}, {})",
            hsv.h, hsv.s, hsv.v
        );
    }

    keyboard.close().await?;
    Ok(())
}

// === Global hue and brightness ===

/// Get or set the global hue
pub async fn hue(printer_config: Option<PrinterConfig>, value: Option<u8>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    match value {
        None => println!("Current hue: {} (0-255)", keyboard.hue().await?),
        Some(hue) => {
            keyboard.set_hue(hue).await?;
            println!("Hue set to {hue} (0-255)");
        }
    }
    keyboard.close().await?;
    Ok(())
}

/// Get or set the global brightness
pub async fn brightness(printer_config: Option<PrinterConfig>, value: Option<u8>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    match value {
        None => println!(
            "Current brightness: {} (0-255)",
            keyboard.brightness().await?
        ),
        Some(brightness) => {
            keyboard.set_brightness(brightness).await?;
            println!("Brightness set to {brightness} (0-255)");
        }
    }
    keyboard.close().await?;
    Ok(())
}

// === Effects ===

/// Show the current effect, or preview one through the scratch slot
pub async fn effect(
    printer_config: Option<PrinterConfig>,
    name: Option<&str>,
    hue: Option<u8>,
    sat: Option<u8>,
    speed: Option<u8>,
) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;

    match name {
        None => {
            let preset = keyboard.current_effect().await?;
            print_effect(&preset);
        }
        Some(name) => {
            let effect = resolve_effect(&keyboard, name).await?;
            keyboard.set_current_effect(effect, hue, sat, speed).await?;
            println!("Effect set successfully:");
            print_effect(&keyboard.current_effect().await?);
        }
    }

    keyboard.close().await?;
    Ok(())
}

// === Presets ===

/// Show or switch the active preset slot
pub async fn preset_index(
    printer_config: Option<PrinterConfig>,
    index: Option<u8>,
    no_save: bool,
) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;

    match index {
        None => {
            let (current, saved) = keyboard.preset_indices().await?;
            if current == TEMP_PRESET_SLOT {
                println!("Currently showing temporary effect");
                println!("Saved preset index: {saved}");
            } else if current != saved {
                println!("Current preset index: {current}");
                println!("Saved preset index: {saved}");
            } else {
                println!("Current preset index: {current}");
            }
        }
        Some(index) => {
            keyboard.set_current_preset_index(index, !no_save).await?;
            println!("Preset index set to {index}");
        }
    }

    keyboard.close().await?;
    Ok(())
}

/// Show one preset slot, or all of them
pub async fn preset_get(printer_config: Option<PrinterConfig>, index: Option<u8>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;

    match index {
        None => {
            for index in 0..=LAST_CYCLABLE_SLOT {
                println!("Preset at index {index}:");
                print_preset(&keyboard.preset(index).await?);
                println!();
            }
            println!("The temporary effect was last set to:");
            print_preset(&keyboard.temp_effect().await?);
        }
        Some(index) => {
            println!("Preset at index {index}:");
            print_preset(&keyboard.preset(index).await?);
        }
    }

    keyboard.close().await?;
    Ok(())
}

/// Update fields of a preset slot, keeping the rest
#[allow(clippy::too_many_arguments)]
pub async fn preset_set(
    printer_config: Option<PrinterConfig>,
    index: u8,
    effect: Option<&str>,
    speed: Option<u8>,
    hue: Option<u8>,
    sat: Option<u8>,
    startup_animation: Option<&str>,
) -> CommandResult {
    if index > LAST_CYCLABLE_SLOT {
        bail!("preset index must be between 0 and {LAST_CYCLABLE_SLOT}; use 'effect' for temporary effects");
    }

    let keyboard = open_keyboard(printer_config).await?;

    let effect = match effect {
        Some(name) => Some(resolve_effect(&keyboard, name).await?),
        None => None,
    };
    if effect == Some(EFFECT_SKIP) && index == 0 {
        bail!("cannot set preset 0 to the skip effect; the Fn cycle needs at least one preset");
    }

    let update = PresetUpdate {
        effect,
        speed,
        fixed_hue: hue.map(|_| true),
        hue,
        sat,
        startup_animation: startup_animation.map(parse_startup_animation).transpose()?,
        flags: None,
    };
    if update.is_empty() {
        bail!("no fields to update; pass --effect, --speed, --hue, --sat or --startup-animation");
    }

    keyboard.set_preset(index, &update).await?;
    println!("Preset {index} set to:");
    print_preset(&keyboard.preset(index).await?);

    keyboard.close().await?;
    Ok(())
}

/// Remove a slot from the Fn cycle
pub async fn preset_skip(printer_config: Option<PrinterConfig>, index: u8) -> CommandResult {
    if index == 0 {
        bail!("cannot set preset 0 to the skip effect; the Fn cycle needs at least one preset");
    }

    let keyboard = open_keyboard(printer_config).await?;
    keyboard.set_preset_skip(index).await?;

    let mask = keyboard.cycle_mask().await?;
    println!("Preset {index} removed from the Fn cycle");
    println!("Cycle order is now: {:?}", mask.order());

    keyboard.close().await?;
    Ok(())
}

/// Return to the saved preset, discarding any temporary effect
pub async fn preset_revert(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.revert_to_saved_preset().await?;
    println!("Preset reverted to saved preset");
    keyboard.close().await?;
    Ok(())
}

/// Factory-reset all preset slots and the direct-LED array
pub async fn reset_presets(printer_config: Option<PrinterConfig>) -> CommandResult {
    let keyboard = open_keyboard(printer_config).await?;
    keyboard.reset_presets_and_direct_leds().await?;
    println!("Keyboard presets and direct LEDs reset");
    keyboard.close().await?;
    Ok(())
}

// === Helpers ===

/// Resolve an effect given by name or id, checking firmware support
async fn resolve_effect(keyboard: &Keyboard, input: &str) -> anyhow::Result<u16> {
    let id = if input.chars().all(|c| c.is_ascii_digit()) {
        input.parse::<u16>().ok()
    } else {
        effects::effect_id(input)
    };
    let supported = keyboard.supported_effects().await?;
    match id {
        Some(id) if supported.contains(&id) => Ok(id),
        _ => bail!("invalid effect: {input:?}; use list-effects to see all available effects"),
    }
}

const STARTUP_ANIMATIONS: [StartupAnimation; 5] = [
    StartupAnimation::None,
    StartupAnimation::BlackNoFade,
    StartupAnimation::BlackFadeValue,
    StartupAnimation::WhiteNoFade,
    StartupAnimation::WhiteFadeSat,
];

fn parse_startup_animation(input: &str) -> anyhow::Result<StartupAnimation> {
    if let Ok(value) = input.parse::<u8>() {
        return StartupAnimation::from_u8(value)
            .ok_or_else(|| anyhow!("invalid startup animation {input:?} (0-4)"));
    }
    let wanted = input.trim().to_lowercase().replace('_', " ");
    STARTUP_ANIMATIONS
        .into_iter()
        .find(|anim| anim.name().to_lowercase() == wanted)
        .ok_or_else(|| {
            let names: Vec<&str> = STARTUP_ANIMATIONS.iter().map(|a| a.name()).collect();
            anyhow!("invalid startup animation {input:?}; options: {}", names.join(", "))
        })
}

fn print_effect(preset: &Preset) {
    if preset.is_skipped() {
        println!("   This is a skip preset");
        return;
    }
    let name = effects::effect_name(preset.effect).unwrap_or("(no name)");
    println!("  Effect: {name} (ID {})", preset.effect);
    if preset.effect != EFFECT_OFF {
        println!("  Speed: {}", preset.speed);
        println!("  Sat: {}", preset.sat);
        if preset.fixed_hue {
            println!("  Hue fixed at: {}", preset.hue);
        } else {
            println!("  Hue not fixed");
        }
    }
}

fn print_preset(preset: &Preset) {
    print_effect(preset);
    if !preset.is_skipped() {
        println!("  Startup Animation: {}", preset.startup_animation.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startup_animation() {
        assert_eq!(
            parse_startup_animation("2").unwrap(),
            StartupAnimation::BlackFadeValue
        );
        assert_eq!(
            parse_startup_animation("black_fade_value").unwrap(),
            StartupAnimation::BlackFadeValue
        );
        assert_eq!(
            parse_startup_animation("White No Fade").unwrap(),
            StartupAnimation::WhiteNoFade
        );
        assert!(parse_startup_animation("5").is_err());
        assert!(parse_startup_animation("sparkle").is_err());
    }
}
