// CLI definitions using clap

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pikbd")]
#[command(author, version, about = "Raspberry Pi 500 / 500+ keyboard configuration tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print every report exchanged with the keyboard
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Show raw hex dumps alongside decoded reports (with --monitor)
    #[arg(long, global = true)]
    pub hex: bool,

    /// Filter monitor output (all, cmd=0xNN)
    #[arg(long, global = true)]
    pub filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Device Commands ===
    /// Show model, firmware and lock status
    #[command(visible_alias = "i")]
    Info,

    /// Show the vendor firmware version
    #[command(visible_aliases = ["ver", "v"])]
    Version,

    /// Show time since the keyboard booted
    Uptime,

    /// Unlock the keyboard (hold the unlock keys when prompted)
    Unlock,

    /// Re-lock the keyboard
    Lock,

    /// Restore the default keymap (requires unlock)
    ResetKeymap,

    /// Factory-reset all lighting presets and direct LEDs
    ResetPresets,

    // === Lighting Commands ===
    /// Operate on all LEDs at once
    #[command(subcommand)]
    Leds(LedsCommands),

    /// Operate on a single LED
    #[command(subcommand)]
    Led(LedCommands),

    /// Get or set the global hue
    Hue {
        /// Hue (0-255); omit to query
        value: Option<u8>,
    },

    /// Get or set the global brightness
    #[command(visible_alias = "bright")]
    Brightness {
        /// Brightness (0-255); omit to query
        value: Option<u8>,
    },

    /// Show the current effect, or preview one without saving it
    #[command(visible_alias = "fx")]
    Effect {
        /// Effect name or id; omit to show the current effect
        name: Option<String>,
        /// Fix the hue at this value (0-255)
        #[arg(short = 'u', long)]
        hue: Option<u8>,
        /// Saturation (0-255, default 255)
        #[arg(short, long)]
        sat: Option<u8>,
        /// Effect speed (0-255, default 128)
        #[arg(short = 'r', long)]
        speed: Option<u8>,
    },

    /// List the RGB effects the firmware supports
    #[command(visible_alias = "effects")]
    ListEffects,

    /// Manage the eight lighting preset slots
    #[command(subcommand)]
    Preset(PresetCommands),

    // === Key Commands ===
    /// List QMK keycode names
    #[command(visible_alias = "keycodes")]
    ListKeycodes {
        /// Only names containing this substring (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Read, bind and watch keys
    #[command(subcommand)]
    Key(KeyCommands),
}

/// Whole-keyboard LED commands
#[derive(Subcommand)]
pub enum LedsCommands {
    /// Turn every LED off
    Clear,

    /// Set every LED to one colour
    Set {
        /// Colour: name, "h,s,v", "#RRGGBB" or "rgb(r,g,b)"
        colour: String,
    },

    /// Show the live direct-LED colours
    Get,

    /// Show the EEPROM copy of the direct-LED colours
    GetSaved,

    /// Persist the live direct-LED colours to EEPROM
    Save,

    /// Restore the direct-LED colours saved in EEPROM
    Load,
}

/// Single-LED commands
#[derive(Subcommand)]
pub enum LedCommands {
    /// Set one LED by index or matrix position
    Set {
        /// LED index (14) or matrix position (2,5)
        position: String,
        /// Colour: name, "h,s,v", "#RRGGBB" or "rgb(r,g,b)"
        colour: String,
    },
}

/// Preset slot commands
#[derive(Subcommand)]
pub enum PresetCommands {
    /// Show or switch the active preset slot
    #[command(visible_alias = "idx")]
    Index {
        /// Slot to switch to (0-7); omit to query
        index: Option<u8>,
        /// Switch for this power cycle only
        #[arg(long)]
        no_save: bool,
    },

    /// Show one preset slot, or all of them
    Get {
        /// Slot (0-7); omit to list every slot
        index: Option<u8>,
    },

    /// Update fields of a preset slot; omitted fields keep their values
    Set {
        /// Slot (0-6)
        index: u8,
        /// Effect name or id
        #[arg(short, long)]
        effect: Option<String>,
        /// Effect speed (0-255)
        #[arg(short = 'r', long)]
        speed: Option<u8>,
        /// Fix the hue at this value (0-255)
        #[arg(short = 'u', long)]
        hue: Option<u8>,
        /// Saturation (0-255)
        #[arg(short, long)]
        sat: Option<u8>,
        /// Startup animation name or id
        #[arg(short = 'a', long)]
        startup_animation: Option<String>,
    },

    /// Remove a slot from the Fn cycle
    Skip {
        /// Slot (1-6); slot 0 always stays in the cycle
        index: u8,
    },

    /// Return to the saved preset, discarding any temporary effect
    Revert,
}

/// Keymap commands
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Read the keycode bound at a matrix position
    Get {
        /// Key row in the matrix
        row: u8,
        /// Key column in the matrix
        col: u8,
        /// Layer (0-3)
        #[arg(short, long, default_value = "0")]
        layer: u8,
    },

    /// Bind a keycode at a matrix position (requires unlock)
    Set {
        /// Key row in the matrix
        row: u8,
        /// Key column in the matrix
        col: u8,
        /// Keycode: QMK name (KC_A), decimal (4) or hex (0x0004)
        keycode: String,
        /// Layer (0-3)
        #[arg(short, long, default_value = "0")]
        layer: u8,
    },

    /// List every bound key on a layer
    GetAll {
        /// Layer (0-3)
        #[arg(short, long, default_value = "0")]
        layer: u8,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print key presses and releases as they happen (requires unlock)
    Watch {
        /// Layer to resolve keycodes on (0-3)
        #[arg(short, long, default_value = "0")]
        layer: u8,
        /// Key that stops the monitor
        #[arg(long, default_value = "KC_ESCAPE")]
        exit_key: String,
        /// Do not light pressed keys
        #[arg(long)]
        no_leds: bool,
    },
}
