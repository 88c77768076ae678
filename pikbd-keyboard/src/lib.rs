//! High-level session interface for Raspberry Pi 500 series keyboards
//!
//! This crate turns the report-level transport into a typed keyboard
//! session: identity and capability resolution at open, the Vial security
//! state machine, the lighting preset engine with its direct-LED mirror,
//! and the keymap store.
//!
//! ```ignore
//! let transport = HidDiscovery::new().open(None)?;
//! let keyboard = Keyboard::open(transport).await?;
//! keyboard.set_hue(128).await?;
//! ```

pub mod capability;
pub mod effects;
pub mod error;
pub mod identity;
pub mod keymap;
pub mod lighting;
pub mod security;

pub use capability::{Capability, CapabilitySet, MIN_FIRMWARE, MIN_VIAL_PROTOCOL, MIN_VIA_PROTOCOL};
pub use error::{
    CapabilityError, KeyboardError, ProtocolError, SecurityError, ValidationError,
};
pub use identity::{DeviceIdentity, FirmwareVersion, KeyboardModel, LayoutVariant};
pub use keymap::{decode_matrix_state, KeyBinding, MatrixDims, KC_NO};
pub use lighting::{
    CycleMask, LedInfo, LedMirror, Preset, PresetUpdate, StartupAnimation, LAST_CYCLABLE_SLOT,
    PRESET_SLOT_COUNT, TEMP_PRESET_SLOT,
};
pub use security::{SecurityState, UnlockStatus};

// Colour values travel as HSV triples end to end
pub use pikbd_transport::Hsv;
pub use pikbd_transport::RgbInfoResponse;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use pikbd_transport::protocol::{timing, DIRECT_LEDS_PER_REPORT};
use pikbd_transport::{
    Ack, BrightnessResponse, DirectFastSet, FirmwareVersionResponse, FlowControlTransport,
    GetBrightness, GetCurrentDirectLeds, GetFirmwareVersion, GetHue, GetKeycode, GetLayoutOptions,
    GetLedCount, GetLedInfo, GetPreset, GetPresetIndex, GetProtocolVersion, GetSavedDirectLeds,
    GetSupportedEffects, GetSwitchMatrixState, GetUnlockStatus, GetUptime, GetVialKeyboardId,
    HueResponse, KeycodeResponse, LayoutOptionsResponse, LedCountResponse, LedInfoResponse,
    LoadDirectLeds, Lock, PresetIndexResponse, PresetResponse, ProtocolVersionResponse,
    ResetEeprom, ResetKeymap, SaveDirectLeds, SetBrightness, SetHue, SetKeycode, SetPreset,
    SetPresetIndex, SupportedEffectsResponse, SwitchMatrixResponse, Transport, UnlockPoll,
    UnlockPollResponse, UnlockStart, UnlockStatusResponse, UptimeResponse, VialKeyboardIdResponse,
    DirectLedsResponse,
};

use crate::effects::{EFFECT_DIRECT, EFFECT_OFF, EFFECT_SKIP};
use crate::lighting::LedMirror as Mirror;

/// Default deadline for the unlock handshake
pub const UNLOCK_TIMEOUT: Duration = Duration::from_millis(timing::UNLOCK_TIMEOUT_MS);

const UNLOCK_POLL_INTERVAL: Duration = Duration::from_millis(timing::UNLOCK_POLL_INTERVAL_MS);

/// A connected, identity-resolved keyboard session
///
/// Construction runs the full open handshake: model/variant parsing, a
/// resume of any in-flight unlock, the Via/Vial/firmware compatibility
/// gates, and the LED map fetch on RGB-capable hardware. Every operation
/// afterwards checks capability and security state before touching the
/// transport.
pub struct Keyboard {
    transport: Arc<FlowControlTransport>,
    identity: DeviceIdentity,
    capabilities: CapabilitySet,
    dims: MatrixDims,
    security: parking_lot::Mutex<SecurityState>,
    /// Held for the duration of an unlock handshake so concurrent callers
    /// run exactly one
    unlock_gate: tokio::sync::Mutex<()>,
    mirror: parking_lot::Mutex<Mirror>,
}

impl Keyboard {
    /// Open a session over a raw transport
    ///
    /// Fails with [`ProtocolError::Unsupported`] when the device does not
    /// meet the Via 9 / Vial 4 / firmware 1.2.0 floor.
    pub async fn open(transport: Arc<dyn Transport>) -> Result<Self, KeyboardError> {
        let flow = Arc::new(FlowControlTransport::new(transport));

        let product = flow
            .device_info()
            .product_name
            .clone()
            .unwrap_or_default();
        let (model, mut variant) = identity::parse_product_string(&product).ok_or_else(|| {
            ProtocolError::Unsupported(format!("unknown keyboard model {product:?}"))
        })?;
        if model == KeyboardModel::Pi500 && variant.is_none() {
            variant = identity::variant_from_device_tree(Path::new(identity::COUNTRY_CODE_PATH));
        }

        // A keyboard abandoned mid-unlock accepts nothing but the unlock
        // commands; resolve that before the version queries.
        let status: UnlockStatusResponse = flow.execute(&GetUnlockStatus).await?;
        let mut state = SecurityState::from_flags(status.unlocked, status.in_progress);
        if status.in_progress {
            warn!("Keyboard is waiting for unlock; resuming the handshake");
            state = run_unlock_handshake(&flow, UNLOCK_TIMEOUT, |_| {}).await?;
        }

        let via: ProtocolVersionResponse = flow.execute(&GetProtocolVersion).await?;
        if via.version < u16::from(MIN_VIA_PROTOCOL) {
            return Err(ProtocolError::Unsupported(format!(
                "the keyboard does not support Via protocol {MIN_VIA_PROTOCOL} or later"
            ))
            .into());
        }

        let vial: VialKeyboardIdResponse = flow.execute(&GetVialKeyboardId).await?;
        if vial.vial_protocol < MIN_VIAL_PROTOCOL {
            return Err(ProtocolError::Unsupported(format!(
                "the keyboard does not support Vial protocol {MIN_VIAL_PROTOCOL} or later"
            ))
            .into());
        }

        let fw: FirmwareVersionResponse = flow.execute(&GetFirmwareVersion).await?;
        let firmware = FirmwareVersion::new(fw.major, fw.minor, fw.patch);
        if firmware < MIN_FIRMWARE {
            return Err(ProtocolError::Unsupported(format!(
                "the keyboard does not support firmware version {MIN_FIRMWARE} or later"
            ))
            .into());
        }

        let vialrgb = vial.supports_vialrgb();
        if model == KeyboardModel::Pi500Plus && !vialrgb {
            warn!("Keyboard does not advertise VialRGB; RGB operations will not be available");
        }

        let identity = DeviceIdentity {
            model,
            variant,
            firmware,
            via_protocol: via.version,
            vial_protocol: vial.vial_protocol,
            keyboard_uid: vial.uid,
            vialrgb,
        };
        let capabilities = CapabilitySet::from_identity(&identity);

        let map = if capabilities.supports(Capability::Lighting) {
            fetch_led_map(&flow).await?
        } else {
            Vec::new()
        };

        info!(
            "Connected to {} ({}) firmware {}",
            identity.model,
            identity
                .variant
                .map_or_else(|| "unknown layout".to_string(), |v| v.to_string()),
            identity.firmware
        );

        Ok(Self {
            transport: flow,
            dims: MatrixDims::for_model(model),
            identity,
            capabilities,
            security: parking_lot::Mutex::new(state),
            unlock_gate: tokio::sync::Mutex::new(()),
            mirror: parking_lot::Mutex::new(Mirror::new(map)),
        })
    }

    /// Get the underlying flow-controlled transport
    pub fn transport(&self) -> &Arc<FlowControlTransport> {
        &self.transport
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn model(&self) -> KeyboardModel {
        self.identity.model
    }

    pub fn firmware_version(&self) -> FirmwareVersion {
        self.identity.firmware
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Matrix grid of the connected model
    pub fn matrix_dims(&self) -> MatrixDims {
        self.dims
    }

    /// Close the session and release the device
    pub async fn close(&self) -> Result<(), KeyboardError> {
        Ok(self.transport.close().await?)
    }

    fn require_lighting(&self) -> Result<(), KeyboardError> {
        Ok(self.capabilities.check(Capability::Lighting)?)
    }

    fn require_unlocked(&self) -> Result<(), KeyboardError> {
        if self.security.lock().is_unlocked() {
            Ok(())
        } else {
            Err(SecurityError::LockedDevice.into())
        }
    }

    // === Device Info ===

    /// Get time since the keyboard booted
    pub async fn uptime(&self) -> Result<Duration, KeyboardError> {
        let resp: UptimeResponse = self.transport.execute(&GetUptime).await?;
        Ok(Duration::from_millis(u64::from(resp.millis)))
    }

    /// Get the Via layout options bitfield
    pub async fn layout_options(&self) -> Result<u32, KeyboardError> {
        let resp: LayoutOptionsResponse = self.transport.execute(&GetLayoutOptions).await?;
        Ok(resp.options)
    }

    /// Get the VialRGB protocol version and maximum brightness
    pub async fn vialrgb_info(&self) -> Result<RgbInfoResponse, KeyboardError> {
        self.require_lighting()?;
        Ok(self.transport.execute(&pikbd_transport::GetRgbInfo).await?)
    }

    /// Enumerate the effect ids the firmware implements
    ///
    /// Every keyboard supports off and the skip sentinel, so both are
    /// included without asking.
    pub async fn supported_effects(&self) -> Result<Vec<u16>, KeyboardError> {
        self.require_lighting()?;
        let mut effects = vec![EFFECT_OFF, EFFECT_SKIP];
        let mut cursor = 0u16;
        loop {
            let resp: SupportedEffectsResponse = self
                .transport
                .execute(&GetSupportedEffects::new(cursor))
                .await?;
            effects.extend(resp.effects.iter().filter(|&&e| e != EFFECT_OFF));
            match resp.effects.last() {
                Some(&last) if !resp.terminated => cursor = last,
                _ => break,
            }
        }
        Ok(effects)
    }

    /// Get the number of controllable LEDs
    pub async fn led_count(&self) -> Result<u16, KeyboardError> {
        self.require_lighting()?;
        let resp: LedCountResponse = self.transport.execute(&GetLedCount).await?;
        Ok(resp.count)
    }

    /// Query position and flags of a single LED
    pub async fn led_info(&self, index: u8) -> Result<LedInfo, KeyboardError> {
        self.require_lighting()?;
        let resp: LedInfoResponse = self.transport.execute(&GetLedInfo::new(index)).await?;
        Ok(LedInfo::from_response(u16::from(index), &resp))
    }

    /// The LED map fetched at open time
    pub fn led_map(&self) -> Vec<LedInfo> {
        self.mirror.lock().map().to_vec()
    }

    // === Security ===

    /// Lock state as last observed; no exchange
    pub fn security_state(&self) -> SecurityState {
        *self.security.lock()
    }

    /// Query the device lock state and the keys of the unlock combo
    pub async fn unlock_status(&self) -> Result<UnlockStatus, KeyboardError> {
        let resp: UnlockStatusResponse = self.transport.execute(&GetUnlockStatus).await?;
        let status = UnlockStatus::from(resp);
        *self.security.lock() = status.state();
        Ok(status)
    }

    /// Run the unlock handshake with the default deadline
    pub async fn unlock(&self) -> Result<(), KeyboardError> {
        self.unlock_with(UNLOCK_TIMEOUT, |_| {}).await
    }

    /// Run the unlock handshake, reporting each poll to `on_poll`
    ///
    /// No-op when already unlocked. The physical unlock keys must be held
    /// while the firmware counts down; `on_poll` sees every poll reply and
    /// can surface the counter. Concurrent calls perform one handshake:
    /// later callers wait and re-check.
    pub async fn unlock_with<F>(&self, timeout: Duration, on_poll: F) -> Result<(), KeyboardError>
    where
        F: FnMut(&UnlockPollResponse),
    {
        if self.unlock_status().await?.unlocked {
            return Ok(());
        }
        let _gate = self.unlock_gate.lock().await;
        // Someone else may have completed the handshake while we waited
        if self.unlock_status().await?.unlocked {
            return Ok(());
        }

        *self.security.lock() = SecurityState::Unlocking;
        match run_unlock_handshake(&self.transport, timeout, on_poll).await {
            Ok(state) => {
                *self.security.lock() = state;
                if state.is_unlocked() {
                    info!("Keyboard unlocked");
                    Ok(())
                } else {
                    Err(SecurityError::LockedDevice.into())
                }
            }
            Err(e) => {
                *self.security.lock() = SecurityState::Locked;
                Err(e)
            }
        }
    }

    /// Re-lock the keyboard
    pub async fn lock(&self) -> Result<(), KeyboardError> {
        let _ack: Ack = self.transport.execute(&Lock).await?;
        *self.security.lock() = SecurityState::Locked;
        info!("Keyboard locked");
        Ok(())
    }

    // === Lighting: global values ===

    /// Get the global hue
    pub async fn hue(&self) -> Result<u8, KeyboardError> {
        self.require_lighting()?;
        let resp: HueResponse = self.transport.execute(&GetHue).await?;
        Ok(resp.hue)
    }

    /// Set the global hue, applied to effects that do not fix their own
    pub async fn set_hue(&self, hue: u8) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let _ack: Ack = self.transport.execute(&SetHue::new(hue)).await?;
        Ok(())
    }

    /// Get the global brightness
    pub async fn brightness(&self) -> Result<u8, KeyboardError> {
        self.require_lighting()?;
        let resp: BrightnessResponse = self.transport.execute(&GetBrightness).await?;
        Ok(resp.brightness)
    }

    /// Set the global brightness
    pub async fn set_brightness(&self, brightness: u8) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let _ack: Ack = self.transport.execute(&SetBrightness::new(brightness)).await?;
        Ok(())
    }

    // === Lighting: presets ===

    /// Read one preset slot from the device
    pub async fn preset(&self, index: u8) -> Result<Preset, KeyboardError> {
        self.require_lighting()?;
        self.check_slot(index, PRESET_SLOT_COUNT - 1)?;
        let resp: PresetResponse = self.transport.execute(&GetPreset::new(index)).await?;
        Ok(Preset::from_wire(&resp.preset).map_err(ProtocolError::Malformed)?)
    }

    /// Update a preset slot, keeping unspecified fields
    ///
    /// Reads the slot from the device first; the Fn cycle can change
    /// presets out of band, so the cache is never trusted for this.
    pub async fn set_preset(&self, index: u8, update: &PresetUpdate) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.check_slot(index, PRESET_SLOT_COUNT - 1)?;
        let current = self.preset(index).await?;
        self.write_preset(index, &update.apply(current)).await
    }

    /// Exclude a slot from the Fn cycle, keeping its other settings
    pub async fn set_preset_skip(&self, index: u8) -> Result<(), KeyboardError> {
        self.check_slot(index, LAST_CYCLABLE_SLOT)?;
        let update = PresetUpdate {
            effect: Some(EFFECT_SKIP),
            ..PresetUpdate::default()
        };
        self.set_preset(index, &update).await
    }

    /// Read the cyclable slots and derive the Fn cycle view
    pub async fn cycle_mask(&self) -> Result<CycleMask, KeyboardError> {
        self.require_lighting()?;
        let mut presets = Vec::with_capacity(usize::from(LAST_CYCLABLE_SLOT) + 1);
        for index in 0..=LAST_CYCLABLE_SLOT {
            presets.push(self.preset(index).await?);
        }
        let (current, saved) = self.preset_indices().await?;
        Ok(CycleMask::from_presets(&presets, current, saved))
    }

    /// Get the shown and boot-persisted preset indices
    pub async fn preset_indices(&self) -> Result<(u8, u8), KeyboardError> {
        self.require_lighting()?;
        let resp: PresetIndexResponse = self.transport.execute(&GetPresetIndex).await?;
        Ok((resp.current, resp.saved))
    }

    /// Switch the shown preset; with `save` it also survives power cycles
    pub async fn set_current_preset_index(
        &self,
        index: u8,
        save: bool,
    ) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.check_slot(index, PRESET_SLOT_COUNT - 1)?;
        let _ack: Ack = self
            .transport
            .execute(&SetPresetIndex::new(index, save))
            .await?;
        Ok(())
    }

    /// Re-apply the boot-persisted preset, discarding any temporary effect
    pub async fn revert_to_saved_preset(&self) -> Result<(), KeyboardError> {
        let (_, saved) = self.preset_indices().await?;
        self.set_current_preset_index(saved, true).await
    }

    // === Lighting: effects ===

    /// The effect currently shown, with the global hue merged in unless
    /// the preset fixes its own
    pub async fn current_effect(&self) -> Result<Preset, KeyboardError> {
        let (current, _) = self.preset_indices().await?;
        let mut preset = self.preset(current).await?;
        if !preset.fixed_hue {
            preset.hue = self.hue().await?;
        }
        Ok(preset)
    }

    /// Show an effect without touching the saved presets
    ///
    /// Writes the scratch slot and switches to it unsaved. When the
    /// requested effect is already shown and no parameter is given this
    /// does nothing.
    pub async fn set_current_effect(
        &self,
        effect: u16,
        hue: Option<u8>,
        sat: Option<u8>,
        speed: Option<u8>,
    ) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        if hue.is_none() && sat.is_none() && speed.is_none() {
            let shown = self.current_effect().await?;
            if shown.effect == effect {
                return Ok(());
            }
        }
        let preset = Preset {
            effect,
            speed: speed.unwrap_or(128),
            fixed_hue: hue.is_some(),
            hue: hue.unwrap_or(0),
            sat: sat.unwrap_or(255),
            ..Preset::default()
        };
        self.set_temp_effect(preset).await
    }

    /// Read the scratch slot
    pub async fn temp_effect(&self) -> Result<Preset, KeyboardError> {
        self.preset(TEMP_PRESET_SLOT).await
    }

    /// Write the scratch slot and show it without saving the index
    pub async fn set_temp_effect(&self, preset: Preset) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.write_preset(TEMP_PRESET_SLOT, &preset).await?;
        self.set_current_preset_index(TEMP_PRESET_SLOT, false).await
    }

    /// Switch to per-LED direct control via the scratch slot
    pub async fn set_led_direct_effect(&self) -> Result<(), KeyboardError> {
        let preset = Preset {
            effect: EFFECT_DIRECT,
            speed: 255,
            fixed_hue: true,
            hue: 255,
            sat: 255,
            ..Preset::default()
        };
        self.set_temp_effect(preset).await
    }

    // === Lighting: direct LEDs ===

    /// Set one LED in the mirror by index; no I/O
    pub fn set_led_by_index(&self, index: u16, color: Hsv) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.mirror
            .lock()
            .set_by_index(index, color)
            .map_err(|count| {
                ValidationError::OutOfRange {
                    field: "led index",
                    value: u32::from(index),
                    max: u32::from(count).saturating_sub(1),
                }
                .into()
            })
    }

    /// Set one LED in the mirror by matrix position; no I/O
    pub fn set_led_by_matrix(&self, row: u8, col: u8, color: Hsv) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.mirror
            .lock()
            .set_by_matrix(row, col, color)
            .map(|_| ())
            .ok_or_else(|| {
                ValidationError::InvalidFormat(format!("no LED at matrix position {row},{col}"))
                    .into()
            })
    }

    /// Flush the whole mirror to the device
    ///
    /// Switches to the direct effect first when something else is shown,
    /// then streams the colours in report-sized runs.
    pub async fn send_leds(&self) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.ensure_direct_effect().await?;
        let colors: Vec<Hsv> = self.mirror.lock().colors().to_vec();
        for (chunk_index, chunk) in colors.chunks(DIRECT_LEDS_PER_REPORT).enumerate() {
            let start = (chunk_index * DIRECT_LEDS_PER_REPORT) as u16;
            let _ack: Ack = self
                .transport
                .execute(&DirectFastSet::new(start, chunk))
                .await?;
        }
        Ok(())
    }

    /// Flush a single LED from the mirror without switching effects
    pub async fn send_led_by_index(&self, index: u16) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let color = {
            let mirror = self.mirror.lock();
            mirror.colors().get(usize::from(index)).copied().ok_or(
                ValidationError::OutOfRange {
                    field: "led index",
                    value: u32::from(index),
                    max: (mirror.len() as u32).saturating_sub(1),
                },
            )?
        };
        let _ack: Ack = self
            .transport
            .execute(&DirectFastSet::new(index, &[color]))
            .await?;
        Ok(())
    }

    /// Mirror to all-off and flush
    pub async fn clear_leds(&self) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        self.mirror.lock().clear();
        self.send_leds().await
    }

    /// Read the live direct-LED colours from the device
    pub async fn current_direct_leds(&self) -> Result<Vec<Hsv>, KeyboardError> {
        self.read_direct_leds(false).await
    }

    /// Read the EEPROM copy of the direct-LED colours
    pub async fn saved_direct_leds(&self) -> Result<Vec<Hsv>, KeyboardError> {
        self.read_direct_leds(true).await
    }

    /// Persist the live direct-LED colours to EEPROM
    pub async fn save_direct_leds(&self) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let _ack: Ack = self.transport.execute(&SaveDirectLeds).await?;
        Ok(())
    }

    /// Restore the direct-LED colours from EEPROM
    pub async fn load_direct_leds(&self) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let _ack: Ack = self.transport.execute(&LoadDirectLeds).await?;
        Ok(())
    }

    /// Factory-reset all preset slots and the direct-LED array
    pub async fn reset_presets_and_direct_leds(&self) -> Result<(), KeyboardError> {
        self.require_lighting()?;
        let _ack: Ack = self.transport.execute(&ResetEeprom).await?;
        Ok(())
    }

    // === Keymap ===

    /// Read the keycode bound at a position
    pub async fn keycode(&self, layer: u8, row: u8, col: u8) -> Result<u16, KeyboardError> {
        self.check_position(row, col)?;
        let resp: KeycodeResponse = self
            .transport
            .execute(&GetKeycode::new(layer, row, col))
            .await?;
        Ok(resp.keycode)
    }

    /// Bind a keycode; requires the device to be unlocked
    ///
    /// The firmware echoes the written binding; any divergence surfaces
    /// as an unexpected response.
    pub async fn set_keycode(
        &self,
        layer: u8,
        row: u8,
        col: u8,
        keycode: u16,
    ) -> Result<(), KeyboardError> {
        self.check_position(row, col)?;
        self.require_unlocked()?;
        let resp: KeycodeResponse = self
            .transport
            .execute(&SetKeycode::new(layer, row, col, keycode))
            .await?;
        let sent = [layer, row, col, (keycode >> 8) as u8, keycode as u8];
        let echoed = [
            resp.layer,
            resp.row,
            resp.col,
            (resp.keycode >> 8) as u8,
            resp.keycode as u8,
        ];
        if let Some(i) = (0..sent.len()).find(|&i| sent[i] != echoed[i]) {
            return Err(ProtocolError::UnexpectedResponse {
                expected: sent[i],
                got: echoed[i],
            }
            .into());
        }
        Ok(())
    }

    /// Read every bound position on a layer
    ///
    /// One exchange per matrix position, no caching: live Vial editing
    /// can change the map at any time.
    pub async fn all_keycodes(&self, layer: u8) -> Result<Vec<KeyBinding>, KeyboardError> {
        let mut bindings = Vec::new();
        for row in 0..self.dims.rows {
            for col in 0..self.dims.cols {
                let keycode = self.keycode(layer, row, col).await?;
                if keycode != KC_NO {
                    bindings.push(KeyBinding {
                        layer,
                        row,
                        col,
                        keycode,
                    });
                }
            }
        }
        Ok(bindings)
    }

    /// Restore the firmware's default keymap; requires unlocked
    pub async fn reset_keymap(&self) -> Result<(), KeyboardError> {
        self.require_unlocked()?;
        let _ack: Ack = self.transport.execute(&ResetKeymap).await?;
        Ok(())
    }

    /// Read which switches are currently closed; requires unlocked
    pub async fn switch_matrix_state(&self) -> Result<Vec<(u8, u8)>, KeyboardError> {
        self.capabilities.check(Capability::MatrixState)?;
        self.require_unlocked()?;
        let resp: SwitchMatrixResponse = self.transport.execute(&GetSwitchMatrixState).await?;
        Ok(decode_matrix_state(&resp.raw, self.dims))
    }

    // === Internals ===

    async fn write_preset(&self, index: u8, preset: &Preset) -> Result<(), KeyboardError> {
        let _ack: Ack = self
            .transport
            .execute(&SetPreset::new(preset.to_wire(index)))
            .await?;
        Ok(())
    }

    /// Switch to the direct effect unless the scratch slot already shows it
    async fn ensure_direct_effect(&self) -> Result<(), KeyboardError> {
        let (current, _) = self.preset_indices().await?;
        if current == TEMP_PRESET_SLOT && self.temp_effect().await?.effect == EFFECT_DIRECT {
            return Ok(());
        }
        debug!("Switching to the direct LED effect");
        self.set_led_direct_effect().await
    }

    async fn read_direct_leds(&self, saved: bool) -> Result<Vec<Hsv>, KeyboardError> {
        self.require_lighting()?;
        let total = self.mirror.lock().len();
        let mut colors = Vec::with_capacity(total);
        let mut offset = 0usize;
        while offset < total {
            let count = (total - offset).min(DIRECT_LEDS_PER_REPORT) as u8;
            let resp: DirectLedsResponse = if saved {
                self.transport
                    .execute(&GetSavedDirectLeds::new(offset as u16, count))
                    .await?
            } else {
                self.transport
                    .execute(&GetCurrentDirectLeds::new(offset as u16, count))
                    .await?
            };
            colors.extend_from_slice(&resp.leds);
            offset += usize::from(count);
        }
        Ok(colors)
    }

    fn check_slot(&self, index: u8, max: u8) -> Result<(), KeyboardError> {
        if index > max {
            return Err(ValidationError::OutOfRange {
                field: "preset index",
                value: u32::from(index),
                max: u32::from(max),
            }
            .into());
        }
        Ok(())
    }

    fn check_position(&self, row: u8, col: u8) -> Result<(), KeyboardError> {
        if row >= self.dims.rows {
            return Err(ValidationError::OutOfRange {
                field: "row",
                value: u32::from(row),
                max: u32::from(self.dims.rows) - 1,
            }
            .into());
        }
        if col >= self.dims.cols {
            return Err(ValidationError::OutOfRange {
                field: "col",
                value: u32::from(col),
                max: u32::from(self.dims.cols) - 1,
            }
            .into());
        }
        Ok(())
    }
}

/// Drive the Vial unlock handshake to a terminal state
///
/// Sends UNLOCK_START (also valid when a handshake is already running)
/// and polls until the firmware stops reporting in-progress or `timeout`
/// elapses.
async fn run_unlock_handshake<F>(
    flow: &FlowControlTransport,
    timeout: Duration,
    mut on_poll: F,
) -> Result<SecurityState, KeyboardError>
where
    F: FnMut(&UnlockPollResponse),
{
    let _ack: Ack = flow.execute(&UnlockStart).await?;
    let started = tokio::time::Instant::now();
    loop {
        let poll: UnlockPollResponse = flow.execute(&UnlockPoll).await?;
        on_poll(&poll);
        if !poll.in_progress {
            return Ok(SecurityState::from_flags(poll.unlocked, poll.in_progress));
        }
        debug!(counter = poll.counter, "Unlock counter");
        if started.elapsed() >= timeout {
            return Err(SecurityError::UnlockTimeout { waited: timeout }.into());
        }
        tokio::time::sleep(UNLOCK_POLL_INTERVAL).await;
    }
}

/// Query the LED map one entry at a time
async fn fetch_led_map(flow: &FlowControlTransport) -> Result<Vec<LedInfo>, KeyboardError> {
    let count: LedCountResponse = flow.execute(&GetLedCount).await?;
    let mut map = Vec::with_capacity(usize::from(count.count));
    for index in 0..count.count {
        // The info request addresses LEDs with a single byte
        let Ok(request_index) = u8::try_from(index) else {
            break;
        };
        let resp: LedInfoResponse = flow.execute(&GetLedInfo::new(request_index)).await?;
        map.push(LedInfo::from_response(index, &resp));
    }
    debug!("Fetched LED map with {} entries", map.len());
    Ok(map)
}
