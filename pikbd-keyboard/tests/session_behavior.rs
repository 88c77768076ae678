//! Session behavior against a scripted in-memory device.
//!
//! `FakeKeyboard` implements [`Transport`] by decoding each request and
//! answering from mutable device state, so the open handshake, security
//! gating, lighting flows and keymap paths run without hardware.
//!
//! Run with: cargo test -p pikbd-keyboard --test session_behavior

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pikbd_keyboard::effects::{EFFECT_DIRECT, EFFECT_OFF, EFFECT_SKIP};
use pikbd_keyboard::{
    Capability, CapabilityError, FirmwareVersion, Hsv, Keyboard, KeyboardError, KeyboardModel,
    LayoutVariant, PresetUpdate, ProtocolError, SecurityError, SecurityState, ValidationError,
};
use pikbd_transport::protocol::{cmd, keyboard_value, rpi, vial, vialrgb, REPORT_SIZE};
use pikbd_transport::{Transport, TransportDeviceInfo, TransportError};

/// LEDs the fake advertises; more than one report's worth so paged reads
/// and chunked writes are exercised.
const LED_TOTAL: usize = 12;

/// Highest effect id the fake implements; large enough that enumeration
/// takes two GET_SUPPORTED pages.
const MAX_EFFECT: u16 = 20;

/// Polls the fake firmware needs before an unlock handshake completes.
const UNLOCK_COUNTDOWN: u8 = 2;

/// Matrix position behind an LED index; the last LED is decorative.
fn led_position(index: usize) -> Option<(u8, u8)> {
    if index + 1 == LED_TOTAL {
        None
    } else {
        Some(((index / 6) as u8, (index % 6) as u8))
    }
}

/// EEPROM preset record in wire order:
/// `[index, flags, effect_lo, effect_hi, speed, fixed_hue, startup, hue, sat]`
fn preset_record(
    index: u8,
    effect: u16,
    speed: u8,
    fixed_hue: u8,
    startup: u8,
    hue: u8,
    sat: u8,
) -> [u8; 9] {
    let e = effect.to_le_bytes();
    [index, 0xFF, e[0], e[1], speed, fixed_hue, startup, hue, sat]
}

fn default_presets() -> [[u8; 9]; 8] {
    std::array::from_fn(|i| preset_record(i as u8, 2, 128, 0, 0x02, 0, 255))
}

/// Zero-padded 32-byte reply starting with `prefix`
fn report(prefix: &[u8]) -> Vec<u8> {
    let mut rep = vec![0u8; REPORT_SIZE];
    rep[..prefix.len()].copy_from_slice(prefix);
    rep
}

struct DeviceState {
    via_protocol: u16,
    vial_protocol: u32,
    uid: u64,
    flags: u8,
    /// `[major, minor << 4 | patch]` as GET_VERSION returns it
    firmware: [u8; 2],
    unlocked: bool,
    in_progress: bool,
    unlock_counter: u8,
    uptime_ms: u32,
    hue: u8,
    brightness: u8,
    current_index: u8,
    saved_index: u8,
    presets: [[u8; 9]; 8],
    keymap: HashMap<(u8, u8, u8), u16>,
    current_leds: Vec<Hsv>,
    saved_leds: Vec<Hsv>,
    pressed: Vec<(u8, u8)>,
    /// UNLOCK_START commands received
    unlock_starts: usize,
    /// SET_PRESET commands received
    preset_writes: usize,
    /// (start, count) of every DIRECT_FASTSET received, in order
    fastset_runs: Vec<(u16, u8)>,
    /// Corrupt the keycode byte in SET_KEYCODE echoes
    corrupt_keycode_echo: bool,
}

/// In-memory stand-in for the keyboard firmware
///
/// Decodes each request and synthesizes the reply a real device would
/// send, mutating its state for writes.
struct FakeKeyboard {
    state: Mutex<DeviceState>,
    exchanges: AtomicUsize,
    info: TransportDeviceInfo,
}

impl FakeKeyboard {
    fn pi500plus() -> Arc<Self> {
        Self::with_product("Pi 500+ Keyboard - ISO", 0x0011, 0x01)
    }

    fn pi500() -> Arc<Self> {
        Self::with_product("Pi 500 Keyboard", 0x0010, 0x00)
    }

    fn with_product(product: &str, pid: u16, flags: u8) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DeviceState {
                via_protocol: 9,
                vial_protocol: 6,
                uid: 0x6D77_F1C2_8C1D_4EF9,
                flags,
                firmware: [1, 0x20],
                unlocked: false,
                in_progress: false,
                unlock_counter: 0,
                uptime_ms: 0,
                hue: 0,
                brightness: 255,
                current_index: 0,
                saved_index: 0,
                presets: default_presets(),
                keymap: HashMap::new(),
                current_leds: vec![Hsv::OFF; LED_TOTAL],
                saved_leds: vec![Hsv::OFF; LED_TOTAL],
                pressed: Vec::new(),
                unlock_starts: 0,
                preset_writes: 0,
                fastset_runs: Vec::new(),
                corrupt_keycode_echo: false,
            }),
            exchanges: AtomicUsize::new(0),
            info: TransportDeviceInfo {
                vid: 0x2E8A,
                pid,
                device_path: "/dev/hidraw-fake".into(),
                serial: Some("vial:f64c2b3c".into()),
                product_name: Some(product.into()),
            },
        })
    }

    fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeKeyboard {
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        // Strip the report ID; body[0] is the command byte
        let body = &request[1..];
        let mut st = self.state.lock();
        Ok(match body[0] {
            cmd::GET_PROTOCOL_VERSION => {
                let ver = st.via_protocol.to_be_bytes();
                report(&[body[0], ver[0], ver[1]])
            }
            cmd::GET_KEYBOARD_VALUE => match body[1] {
                keyboard_value::GET_UPTIME => {
                    let ms = st.uptime_ms.to_be_bytes();
                    report(&[body[0], body[1], ms[0], ms[1], ms[2], ms[3]])
                }
                keyboard_value::GET_SWITCH_MATRIX_STATE => {
                    let mut rep = report(&[body[0], body[1]]);
                    // Locked firmware reports an all-idle matrix
                    if st.unlocked {
                        for &(row, col) in &st.pressed {
                            let base = 2 + usize::from(row) * 2;
                            let bits = (1u16 << col).to_be_bytes();
                            rep[base] |= bits[0];
                            rep[base + 1] |= bits[1];
                        }
                    }
                    rep
                }
                _ => report(&[body[0], body[1]]),
            },
            cmd::DYNAMIC_KEYMAP_GET_KEYCODE => {
                let code = st
                    .keymap
                    .get(&(body[1], body[2], body[3]))
                    .copied()
                    .unwrap_or(0);
                let kc = code.to_be_bytes();
                report(&[body[0], body[1], body[2], body[3], kc[0], kc[1]])
            }
            cmd::DYNAMIC_KEYMAP_SET_KEYCODE => {
                let code = u16::from_be_bytes([body[4], body[5]]);
                st.keymap.insert((body[1], body[2], body[3]), code);
                let lo = if st.corrupt_keycode_echo {
                    body[5] ^ 0xFF
                } else {
                    body[5]
                };
                report(&[body[0], body[1], body[2], body[3], body[4], lo])
            }
            cmd::DYNAMIC_KEYMAP_RESET => {
                st.keymap.clear();
                report(&[body[0]])
            }
            cmd::LIGHTING_GET_VALUE => match body[1] {
                vialrgb::GET_INFO => report(&[body[0], body[1], 0x01, 0x00, 0xFF]),
                vialrgb::GET_SUPPORTED => {
                    let cursor = u16::from_le_bytes([body[2], body[3]]);
                    let mut rep = report(&[body[0], body[1]]);
                    let mut off = 2;
                    let mut next = cursor + 1;
                    while off + 2 <= REPORT_SIZE && next <= MAX_EFFECT {
                        rep[off..off + 2].copy_from_slice(&next.to_le_bytes());
                        next += 1;
                        off += 2;
                    }
                    if off + 2 <= REPORT_SIZE {
                        rep[off..off + 2].copy_from_slice(&EFFECT_SKIP.to_le_bytes());
                    }
                    rep
                }
                vialrgb::GET_NUMBER_LEDS => {
                    let count = (st.current_leds.len() as u16).to_le_bytes();
                    report(&[body[0], body[1], count[0], count[1]])
                }
                vialrgb::GET_LED_INFO => {
                    let idx = usize::from(body[2]);
                    let (row, col) = led_position(idx).unwrap_or((0xFF, 0xFF));
                    report(&[body[0], body[1], (idx * 8) as u8, 10, 1, row, col])
                }
                _ => report(&[body[0], body[1]]),
            },
            cmd::LIGHTING_SET_VALUE if body[1] == vialrgb::DIRECT_FASTSET => {
                let start = u16::from_le_bytes([body[2], body[3]]);
                let count = usize::from(body[4]);
                for i in 0..count {
                    let off = 5 + i * 3;
                    let slot = usize::from(start) + i;
                    if let Some(led) = st.current_leds.get_mut(slot) {
                        *led = Hsv::new(body[off], body[off + 1], body[off + 2]);
                    }
                }
                st.fastset_runs.push((start, body[4]));
                report(&[body[0], body[1]])
            }
            cmd::RPI_COMMAND => match body[1] {
                rpi::GET_VERSION => {
                    report(&[body[0], body[1], st.firmware[0], st.firmware[1]])
                }
                rpi::RESET_EEPROM => {
                    st.presets = default_presets();
                    st.current_leds.fill(Hsv::OFF);
                    st.saved_leds.fill(Hsv::OFF);
                    st.current_index = 0;
                    st.saved_index = 0;
                    report(&[body[0], body[1]])
                }
                rpi::GET_CURRENT_PRESET_INDEX => {
                    report(&[body[0], body[1], st.current_index, st.saved_index])
                }
                rpi::SET_CURRENT_PRESET_INDEX => {
                    st.current_index = body[2];
                    if body[3] != 0 {
                        st.saved_index = body[2];
                    }
                    report(&[body[0], body[1]])
                }
                rpi::GET_PRESET => {
                    let record = st
                        .presets
                        .get(usize::from(body[2]))
                        .copied()
                        .unwrap_or([0; 9]);
                    let mut rep = report(&[body[0], body[1]]);
                    rep[2..11].copy_from_slice(&record);
                    rep
                }
                rpi::SET_PRESET => {
                    let mut record = [0u8; 9];
                    record.copy_from_slice(&body[2..11]);
                    if let Some(slot) = st.presets.get_mut(usize::from(record[0])) {
                        *slot = record;
                    }
                    st.preset_writes += 1;
                    report(&[body[0], body[1]])
                }
                rpi::GET_HUE => report(&[body[0], body[1], st.hue]),
                rpi::SET_HUE => {
                    st.hue = body[2];
                    report(&[body[0], body[1]])
                }
                rpi::GET_BRIGHTNESS => report(&[body[0], body[1], st.brightness]),
                rpi::SET_BRIGHTNESS => {
                    st.brightness = body[2];
                    report(&[body[0], body[1]])
                }
                rpi::GET_CURRENT_DIRECT_LEDS | rpi::GET_SAVED_DIRECT_LEDS => {
                    let offset = u16::from_le_bytes([body[2], body[3]]);
                    let count = usize::from(body[4]);
                    let leds = if body[1] == rpi::GET_SAVED_DIRECT_LEDS {
                        &st.saved_leds
                    } else {
                        &st.current_leds
                    };
                    let mut rep = report(&[body[0], body[1], body[2], body[3], body[4]]);
                    for i in 0..count {
                        let led = leds
                            .get(usize::from(offset) + i)
                            .copied()
                            .unwrap_or(Hsv::OFF);
                        let off = 5 + i * 3;
                        rep[off] = led.h;
                        rep[off + 1] = led.s;
                        rep[off + 2] = led.v;
                    }
                    rep
                }
                rpi::SAVE_DIRECT_LEDS => {
                    st.saved_leds = st.current_leds.clone();
                    report(&[body[0], body[1]])
                }
                rpi::LOAD_DIRECT_LEDS => {
                    st.current_leds = st.saved_leds.clone();
                    report(&[body[0], body[1]])
                }
                _ => report(&[body[0], body[1]]),
            },
            cmd::VIAL_COMMAND => match body[1] {
                vial::GET_KEYBOARD_ID => {
                    let mut rep = report(&[]);
                    rep[0..4].copy_from_slice(&st.vial_protocol.to_le_bytes());
                    rep[4..12].copy_from_slice(&st.uid.to_le_bytes());
                    rep[12] = st.flags;
                    rep
                }
                vial::GET_UNLOCK_STATUS => {
                    // Unused key slots are 0xFF sentinel pairs
                    let mut rep = vec![0xFF; REPORT_SIZE];
                    rep[0] = u8::from(st.unlocked);
                    rep[1] = u8::from(st.in_progress);
                    rep[2..6].copy_from_slice(&[0, 6, 5, 13]);
                    rep
                }
                vial::UNLOCK_START => {
                    st.in_progress = true;
                    st.unlock_counter = UNLOCK_COUNTDOWN;
                    st.unlock_starts += 1;
                    report(&[body[0], body[1]])
                }
                vial::UNLOCK_POLL => {
                    if st.in_progress {
                        if st.unlock_counter > 1 {
                            st.unlock_counter -= 1;
                            report(&[0, 1, st.unlock_counter])
                        } else {
                            st.in_progress = false;
                            st.unlocked = true;
                            report(&[1, 0, 0])
                        }
                    } else {
                        report(&[u8::from(st.unlocked), 0, 0])
                    }
                }
                vial::LOCK => {
                    st.unlocked = false;
                    st.in_progress = false;
                    report(&[body[0], body[1]])
                }
                _ => report(&[body[0], body[1]]),
            },
            _ => report(&[body[0]]),
        })
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

async fn open(fake: &Arc<FakeKeyboard>) -> Keyboard {
    Keyboard::open(Arc::clone(fake) as Arc<dyn Transport>)
        .await
        .expect("open handshake failed against the fake device")
}

// === Open handshake ===

#[tokio::test]
async fn open_resolves_identity_and_led_map() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    let identity = kb.identity();
    assert_eq!(identity.model, KeyboardModel::Pi500Plus);
    assert_eq!(identity.variant, Some(LayoutVariant::Iso));
    assert_eq!(identity.firmware, FirmwareVersion::new(1, 2, 0));
    assert_eq!(identity.via_protocol, 9);
    assert_eq!(identity.vial_protocol, 6);
    assert_eq!(identity.keyboard_uid, 0x6D77_F1C2_8C1D_4EF9);
    assert!(identity.vialrgb);
    assert!(kb.capabilities().supports(Capability::Lighting));
    assert_eq!(kb.security_state(), SecurityState::Locked);

    let map = kb.led_map();
    assert_eq!(map.len(), LED_TOTAL);
    assert_eq!(map[0].matrix, Some((0, 0)));
    assert_eq!(map[10].matrix, Some((1, 4)));
    assert_eq!(map[LED_TOTAL - 1].matrix, None);

    // status + via + vial id + firmware + led count + one info per LED
    assert_eq!(fake.exchange_count(), 5 + LED_TOTAL);
}

#[tokio::test]
async fn open_rejects_unknown_product() {
    let fake = FakeKeyboard::with_product("Some Other Keyboard", 0x5030, 0x01);
    let err = Keyboard::open(Arc::clone(&fake) as Arc<dyn Transport>)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Protocol(ProtocolError::Unsupported(_))
    ));
    // Rejected before any report was sent
    assert_eq!(fake.exchange_count(), 0);
}

#[tokio::test]
async fn open_rejects_old_firmware() {
    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().firmware = [1, 0x19]; // 1.1.9

    let err = Keyboard::open(Arc::clone(&fake) as Arc<dyn Transport>)
        .await
        .unwrap_err();
    match err {
        KeyboardError::Protocol(ProtocolError::Unsupported(msg)) => {
            assert!(msg.contains("1.2.0"), "unexpected message: {msg}");
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

#[tokio::test]
async fn open_rejects_old_protocols() {
    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().via_protocol = 8;
    let err = Keyboard::open(Arc::clone(&fake) as Arc<dyn Transport>)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Protocol(ProtocolError::Unsupported(_))
    ));

    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().vial_protocol = 3;
    let err = Keyboard::open(Arc::clone(&fake) as Arc<dyn Transport>)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Protocol(ProtocolError::Unsupported(_))
    ));
}

#[tokio::test]
async fn open_resumes_interrupted_unlock() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.in_progress = true;
        st.unlock_counter = UNLOCK_COUNTDOWN;
    }

    let kb = open(&fake).await;
    assert_eq!(kb.security_state(), SecurityState::Unlocked);
    assert_eq!(fake.state.lock().unlock_starts, 1);

    // The resumed session is immediately usable for privileged writes
    kb.set_keycode(0, 2, 3, 0x0029).await.unwrap();
    assert_eq!(fake.state.lock().keymap.get(&(0, 2, 3)), Some(&0x0029));
}

// === Capability gating ===

#[tokio::test]
async fn pi500_gates_lighting_host_side() {
    let fake = FakeKeyboard::pi500();
    let kb = open(&fake).await;

    assert_eq!(kb.model(), KeyboardModel::Pi500);
    assert!(!kb.capabilities().supports(Capability::Lighting));
    assert!(kb.led_map().is_empty());
    // No LED map fetch on a keyboard without lighting
    assert_eq!(fake.exchange_count(), 4);

    let before = fake.exchange_count();
    let err = kb.hue().await.unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Capability(CapabilityError::UnsupportedByModel {
            feature: Capability::Lighting,
            model: KeyboardModel::Pi500,
        })
    ));
    assert!(kb.set_brightness(10).await.is_err());
    assert!(kb.preset(0).await.is_err());
    assert!(kb.send_leds().await.is_err());
    // Every rejection happened without touching the device
    assert_eq!(fake.exchange_count(), before);

    // Keymap reads are model independent
    assert_eq!(kb.keycode(0, 0, 0).await.unwrap(), 0);
}

#[tokio::test]
async fn pi500plus_without_vialrgb_is_a_firmware_limit() {
    let fake = FakeKeyboard::with_product("Pi 500+ Keyboard - ANSI", 0x0011, 0x00);
    let kb = open(&fake).await;

    assert!(!kb.capabilities().supports(Capability::Lighting));
    assert!(kb.led_map().is_empty());
    assert_eq!(fake.exchange_count(), 4);

    let err = kb.hue().await.unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Capability(CapabilityError::UnsupportedByFirmware {
            feature: Capability::Lighting,
            ..
        })
    ));
}

// === Security ===

#[tokio::test]
async fn locked_device_refuses_privileged_operations() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;
    assert_eq!(kb.security_state(), SecurityState::Locked);

    let before = fake.exchange_count();
    assert!(matches!(
        kb.set_keycode(0, 0, 0, 0x0004).await.unwrap_err(),
        KeyboardError::Security(SecurityError::LockedDevice)
    ));
    assert!(matches!(
        kb.reset_keymap().await.unwrap_err(),
        KeyboardError::Security(SecurityError::LockedDevice)
    ));
    assert!(matches!(
        kb.switch_matrix_state().await.unwrap_err(),
        KeyboardError::Security(SecurityError::LockedDevice)
    ));
    // The gate fires before any report is built
    assert_eq!(fake.exchange_count(), before);

    // Reads stay available while locked
    assert_eq!(kb.keycode(0, 0, 0).await.unwrap(), 0);
}

#[tokio::test]
async fn unlock_handshake_drives_to_unlocked() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    let status = kb.unlock_status().await.unwrap();
    assert!(!status.unlocked);
    assert_eq!(status.keys, vec![(0, 6), (5, 13)]);

    let mut counters = Vec::new();
    kb.unlock_with(Duration::from_secs(5), |poll| counters.push(poll.counter))
        .await
        .unwrap();

    assert_eq!(kb.security_state(), SecurityState::Unlocked);
    assert_eq!(fake.state.lock().unlock_starts, 1);
    // One countdown poll, then the completing poll
    assert_eq!(counters, vec![1, 0]);

    kb.set_keycode(1, 0, 5, 0x0204).await.unwrap();
    assert_eq!(fake.state.lock().keymap.get(&(1, 0, 5)), Some(&0x0204));
}

#[tokio::test]
async fn unlock_timeout_restores_locked_state() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    let err = kb.unlock_with(Duration::ZERO, |_| {}).await.unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Security(SecurityError::UnlockTimeout { .. })
    ));
    assert_eq!(kb.security_state(), SecurityState::Locked);
    // The device-side handshake stays pending after the host gave up
    assert!(fake.state.lock().in_progress);

    // A later unlock resumes and completes
    kb.unlock().await.unwrap();
    assert_eq!(kb.security_state(), SecurityState::Unlocked);
    assert_eq!(fake.state.lock().unlock_starts, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_unlocks_run_one_handshake() {
    let fake = FakeKeyboard::pi500plus();
    let kb = Arc::new(open(&fake).await);

    let a = {
        let kb = Arc::clone(&kb);
        tokio::spawn(async move { kb.unlock().await })
    };
    let b = {
        let kb = Arc::clone(&kb);
        tokio::spawn(async move { kb.unlock().await })
    };
    let (a, b) = tokio::try_join!(a, b).expect("an unlock task panicked");
    a.unwrap();
    b.unwrap();

    assert_eq!(kb.security_state(), SecurityState::Unlocked);
    // The loser of the gate re-checked and skipped its own handshake
    assert_eq!(fake.state.lock().unlock_starts, 1);
}

#[tokio::test]
async fn lock_regates_writes() {
    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().unlocked = true;
    let kb = open(&fake).await;
    assert_eq!(kb.security_state(), SecurityState::Unlocked);
    kb.set_keycode(0, 1, 1, 0x0005).await.unwrap();

    kb.lock().await.unwrap();
    assert_eq!(kb.security_state(), SecurityState::Locked);
    assert!(!fake.state.lock().unlocked);
    assert!(matches!(
        kb.set_keycode(0, 1, 1, 0x0006).await.unwrap_err(),
        KeyboardError::Security(SecurityError::LockedDevice)
    ));
}

// === Lighting: direct LEDs ===

#[tokio::test]
async fn send_leds_switches_to_direct_and_streams_chunks() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_led_by_index(0, Hsv::new(170, 255, 255)).unwrap();
    kb.set_led_by_index(11, Hsv::new(0, 255, 128)).unwrap();
    kb.send_leds().await.unwrap();

    {
        let st = fake.state.lock();
        // The scratch slot now runs the direct effect, shown unsaved
        assert_eq!(
            st.presets[7],
            preset_record(7, EFFECT_DIRECT, 255, 1, 0x02, 255, 255)
        );
        assert_eq!(st.preset_writes, 1);
        assert_eq!(st.current_index, 7);
        assert_eq!(st.saved_index, 0);
        // 12 colours stream as a full report plus the remainder
        assert_eq!(st.fastset_runs, vec![(0, 9), (9, 3)]);
        assert_eq!(st.current_leds[0], Hsv::new(170, 255, 255));
        assert_eq!(st.current_leds[11], Hsv::new(0, 255, 128));
        assert_eq!(st.current_leds[5], Hsv::OFF);
    }

    // A second flush sees the direct effect already shown and skips the switch
    kb.send_leds().await.unwrap();
    let st = fake.state.lock();
    assert_eq!(st.preset_writes, 1);
    assert_eq!(st.fastset_runs.len(), 4);
}

#[tokio::test]
async fn send_led_by_index_flushes_one_led() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_led_by_index(5, Hsv::new(10, 20, 30)).unwrap();
    kb.send_led_by_index(5).await.unwrap();

    let st = fake.state.lock();
    assert_eq!(st.fastset_runs, vec![(5, 1)]);
    assert_eq!(st.current_leds[5], Hsv::new(10, 20, 30));
    // No effect switch for a single-LED flush
    assert_eq!(st.preset_writes, 0);
    assert_eq!(st.current_index, 0);
}

#[tokio::test]
async fn led_addressing_validates_against_the_map() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_led_by_matrix(0, 3, Hsv::new(1, 2, 3)).unwrap();
    assert_eq!(kb.led_map()[3].matrix, Some((0, 3)));

    assert!(matches!(
        kb.set_led_by_matrix(9, 9, Hsv::OFF).unwrap_err(),
        KeyboardError::Validation(ValidationError::InvalidFormat(_))
    ));
    assert!(matches!(
        kb.set_led_by_index(LED_TOTAL as u16, Hsv::OFF).unwrap_err(),
        KeyboardError::Validation(ValidationError::OutOfRange {
            field: "led index",
            ..
        })
    ));
}

#[tokio::test]
async fn direct_led_readback_pages_and_persistence() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    let gradient: Vec<Hsv> = (0..LED_TOTAL)
        .map(|i| Hsv::new(i as u8, 2 * i as u8, 3 * i as u8))
        .collect();
    fake.state.lock().current_leds = gradient.clone();

    // 12 LEDs arrive as a 9-LED page plus a 3-LED page
    assert_eq!(kb.current_direct_leds().await.unwrap(), gradient);
    assert_eq!(
        kb.saved_direct_leds().await.unwrap(),
        vec![Hsv::OFF; LED_TOTAL]
    );

    kb.save_direct_leds().await.unwrap();
    assert_eq!(fake.state.lock().saved_leds, gradient);

    fake.state.lock().current_leds = vec![Hsv::OFF; LED_TOTAL];
    kb.load_direct_leds().await.unwrap();
    assert_eq!(fake.state.lock().current_leds, gradient);
}

// === Lighting: presets and effects ===

#[tokio::test]
async fn preset_update_preserves_unset_fields() {
    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().presets[2] = preset_record(2, 5, 77, 1, 0x03, 11, 22);
    let kb = open(&fake).await;

    let update = PresetUpdate {
        hue: Some(99),
        ..PresetUpdate::default()
    };
    kb.set_preset(2, &update).await.unwrap();

    // Only the hue changed; everything else came from the device read
    assert_eq!(
        fake.state.lock().presets[2],
        preset_record(2, 5, 77, 1, 0x03, 99, 22)
    );
}

#[tokio::test]
async fn preset_skip_reshapes_the_cycle() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_preset_skip(3).await.unwrap();
    let record = fake.state.lock().presets[3];
    assert_eq!(u16::from_le_bytes([record[2], record[3]]), EFFECT_SKIP);

    let mask = kb.cycle_mask().await.unwrap();
    assert_eq!(mask.order(), &[0, 1, 2, 4, 5, 6]);
    assert_eq!(mask.next_after(2), Some(4));
    assert_eq!(mask.next_after(6), Some(0));

    // The scratch slot can never be skipped
    assert!(matches!(
        kb.set_preset_skip(7).await.unwrap_err(),
        KeyboardError::Validation(ValidationError::OutOfRange {
            field: "preset index",
            value: 7,
            max: 6,
        })
    ));
}

#[tokio::test]
async fn current_effect_merges_global_hue() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.presets[0] = preset_record(0, 2, 128, 0, 0x02, 10, 255);
        st.hue = 200;
    }
    let kb = open(&fake).await;

    // Slot 0 follows the global hue
    assert_eq!(kb.current_effect().await.unwrap().hue, 200);

    {
        let mut st = fake.state.lock();
        st.presets[1] = preset_record(1, 2, 128, 1, 0x02, 33, 255);
        st.current_index = 1;
    }
    // Slot 1 fixes its own
    let shown = kb.current_effect().await.unwrap();
    assert!(shown.fixed_hue);
    assert_eq!(shown.hue, 33);
}

#[tokio::test]
async fn set_current_effect_uses_the_scratch_slot() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_current_effect(13, None, None, None).await.unwrap();
    {
        let st = fake.state.lock();
        assert_eq!(st.presets[7], preset_record(7, 13, 128, 0, 0x02, 0, 255));
        assert_eq!(st.preset_writes, 1);
        assert_eq!((st.current_index, st.saved_index), (7, 0));
    }

    // Asking for the shown effect with no parameters is a no-op
    kb.set_current_effect(13, None, None, None).await.unwrap();
    assert_eq!(fake.state.lock().preset_writes, 1);

    // An explicit parameter always rewrites, and pins the hue
    kb.set_current_effect(13, Some(42), None, None).await.unwrap();
    let st = fake.state.lock();
    assert_eq!(st.presets[7], preset_record(7, 13, 128, 1, 0x02, 42, 255));
    assert_eq!(st.preset_writes, 2);
}

#[tokio::test]
async fn revert_discards_the_temporary_effect() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    kb.set_led_direct_effect().await.unwrap();
    assert_eq!(kb.preset_indices().await.unwrap(), (7, 0));

    kb.revert_to_saved_preset().await.unwrap();
    assert_eq!(kb.preset_indices().await.unwrap(), (0, 0));
}

#[tokio::test]
async fn supported_effects_spans_pages() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;

    let effects = kb.supported_effects().await.unwrap();
    // Off and the skip sentinel lead, then both device pages
    assert_eq!(effects[0], EFFECT_OFF);
    assert_eq!(effects[1], EFFECT_SKIP);
    assert_eq!(effects.len(), 2 + usize::from(MAX_EFFECT));
    for id in 1..=MAX_EFFECT {
        assert!(effects.contains(&id), "effect {id} missing");
    }
}

#[tokio::test]
async fn global_color_and_uptime_round_trip() {
    let fake = FakeKeyboard::pi500plus();
    fake.state.lock().uptime_ms = 123_456;
    let kb = open(&fake).await;

    assert_eq!(kb.uptime().await.unwrap(), Duration::from_millis(123_456));

    kb.set_hue(77).await.unwrap();
    assert_eq!(kb.hue().await.unwrap(), 77);
    kb.set_brightness(200).await.unwrap();
    assert_eq!(kb.brightness().await.unwrap(), 200);
}

// === Keymap ===

#[tokio::test]
async fn all_keycodes_skips_unbound_positions() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.keymap.insert((0, 0, 0), 0x0004);
        st.keymap.insert((0, 2, 13), 0x0029);
        st.keymap.insert((0, 5, 15), 0x00E0);
    }
    let kb = open(&fake).await;

    let bindings = kb.all_keycodes(0).await.unwrap();
    assert_eq!(bindings.len(), 3);
    // Row-major scan order
    assert_eq!((bindings[0].row, bindings[0].col), (0, 0));
    assert_eq!((bindings[1].row, bindings[1].col), (2, 13));
    assert_eq!((bindings[2].row, bindings[2].col), (5, 15));
    assert_eq!(bindings[1].keycode, 0x0029);
}

#[tokio::test]
async fn reset_keymap_clears_device_bindings() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.unlocked = true;
        st.keymap.insert((0, 0, 0), 0x0004);
    }
    let kb = open(&fake).await;

    kb.reset_keymap().await.unwrap();
    assert!(fake.state.lock().keymap.is_empty());
}

#[tokio::test]
async fn switch_matrix_state_decodes_pressed_keys() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.unlocked = true;
        st.pressed = vec![(2, 13), (0, 0), (5, 15)];
    }
    let kb = open(&fake).await;

    let pressed = kb.switch_matrix_state().await.unwrap();
    assert_eq!(pressed, vec![(0, 0), (2, 13), (5, 15)]);
}

#[tokio::test]
async fn keycode_echo_divergence_is_a_protocol_error() {
    let fake = FakeKeyboard::pi500plus();
    {
        let mut st = fake.state.lock();
        st.unlocked = true;
        st.corrupt_keycode_echo = true;
    }
    let kb = open(&fake).await;

    let err = kb.set_keycode(0, 1, 2, 0x0029).await.unwrap_err();
    assert!(matches!(
        err,
        KeyboardError::Protocol(ProtocolError::UnexpectedResponse {
            expected: 0x29,
            got: 0xD6,
        })
    ));
}

#[tokio::test]
async fn out_of_range_positions_fail_before_any_exchange() {
    let fake = FakeKeyboard::pi500plus();
    let kb = open(&fake).await;
    let before = fake.exchange_count();

    assert!(matches!(
        kb.keycode(0, 6, 0).await.unwrap_err(),
        KeyboardError::Validation(ValidationError::OutOfRange { field: "row", .. })
    ));
    assert!(matches!(
        kb.keycode(0, 0, 16).await.unwrap_err(),
        KeyboardError::Validation(ValidationError::OutOfRange { field: "col", .. })
    ));
    assert!(matches!(
        kb.preset(8).await.unwrap_err(),
        KeyboardError::Validation(ValidationError::OutOfRange {
            field: "preset index",
            ..
        })
    ));
    assert_eq!(fake.exchange_count(), before);
}
