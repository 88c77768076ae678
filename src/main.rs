//! Raspberry Pi 500 series keyboard configuration CLI
//!
//! A command-line interface for the RGB lighting, keymap and security
//! features of Raspberry Pi 500 and 500+ keyboards.

use anyhow::Result;
use clap::Parser;

// CLI definitions
mod cli;
use cli::{Cli, Commands, KeyCommands, LedCommands, LedsCommands, PresetCommands};

mod color;
mod keycodes;

// Command handlers (split from main.rs)
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Create printer config if monitoring is enabled
    let printer_config =
        commands::create_printer_config(cli.monitor, cli.hex, cli.filter.as_deref())?;

    match cli.command {
        None => {
            // Default: show device info
            commands::query::info(printer_config).await?;
        }

        // === Device Commands ===
        Some(Commands::Info) => {
            commands::query::info(printer_config).await?;
        }
        Some(Commands::Version) => {
            commands::query::version(printer_config).await?;
        }
        Some(Commands::Uptime) => {
            commands::query::uptime(printer_config).await?;
        }
        Some(Commands::Unlock) => {
            commands::security::unlock(printer_config).await?;
        }
        Some(Commands::Lock) => {
            commands::security::lock(printer_config).await?;
        }
        Some(Commands::ResetKeymap) => {
            commands::keymap::reset_keymap(printer_config).await?;
        }
        Some(Commands::ResetPresets) => {
            commands::lighting::reset_presets(printer_config).await?;
        }

        // === Lighting Commands ===
        Some(Commands::Leds(leds_cmd)) => match leds_cmd {
            LedsCommands::Clear => {
                commands::lighting::leds_clear(printer_config).await?;
            }
            LedsCommands::Set { colour } => {
                commands::lighting::leds_set(printer_config, &colour).await?;
            }
            LedsCommands::Get => {
                commands::lighting::leds_get(printer_config, false).await?;
            }
            LedsCommands::GetSaved => {
                commands::lighting::leds_get(printer_config, true).await?;
            }
            LedsCommands::Save => {
                commands::lighting::leds_save(printer_config).await?;
            }
            LedsCommands::Load => {
                commands::lighting::leds_load(printer_config).await?;
            }
        },
        Some(Commands::Led(led_cmd)) => match led_cmd {
            LedCommands::Set { position, colour } => {
                commands::lighting::led_set(printer_config, &position, &colour).await?;
            }
        },
        Some(Commands::Hue { value }) => {
            commands::lighting::hue(printer_config, value).await?;
        }
        Some(Commands::Brightness { value }) => {
            commands::lighting::brightness(printer_config, value).await?;
        }
        Some(Commands::Effect {
            name,
            hue,
            sat,
            speed,
        }) => {
            commands::lighting::effect(printer_config, name.as_deref(), hue, sat, speed).await?;
        }
        Some(Commands::ListEffects) => {
            commands::query::list_effects(printer_config).await?;
        }
        Some(Commands::Preset(preset_cmd)) => match preset_cmd {
            PresetCommands::Index { index, no_save } => {
                commands::lighting::preset_index(printer_config, index, no_save).await?;
            }
            PresetCommands::Get { index } => {
                commands::lighting::preset_get(printer_config, index).await?;
            }
            PresetCommands::Set {
                index,
                effect,
                speed,
                hue,
                sat,
                startup_animation,
            } => {
                commands::lighting::preset_set(
                    printer_config,
                    index,
                    effect.as_deref(),
                    speed,
                    hue,
                    sat,
                    startup_animation.as_deref(),
                )
                .await?;
            }
            PresetCommands::Skip { index } => {
                commands::lighting::preset_skip(printer_config, index).await?;
            }
            PresetCommands::Revert => {
                commands::lighting::preset_revert(printer_config).await?;
            }
        },

        // === Key Commands ===
        Some(Commands::ListKeycodes { filter }) => {
            commands::query::list_keycodes(filter.as_deref())?;
        }
        Some(Commands::Key(key_cmd)) => match key_cmd {
            KeyCommands::Get { row, col, layer } => {
                commands::keymap::key_get(printer_config, row, col, layer).await?;
            }
            KeyCommands::Set {
                row,
                col,
                keycode,
                layer,
            } => {
                commands::keymap::key_set(printer_config, row, col, &keycode, layer).await?;
            }
            KeyCommands::GetAll { layer, json } => {
                commands::keymap::key_get_all(printer_config, layer, json).await?;
            }
            KeyCommands::Watch {
                layer,
                exit_key,
                no_leds,
            } => {
                commands::keymap::key_watch(printer_config, layer, &exit_key, no_leds).await?;
            }
        },
    }

    Ok(())
}
