use log::debug;
use num_derive::FromPrimitive;

use crate::events::ControlEvent;

/// Fixed length of a raw master-controller HID report.
pub const REPORT_LEN: usize = 8;

const IDX_BUTTONS: usize = 0;
const IDX_SECONDARY: usize = 1;
const IDX_HAT: usize = 2;
const IDX_HANDLE: usize = 4;

const MASK_HAT: u8 = 0x0f;

/// Detent positions of the one-handle master controller, with the raw byte
/// each detent reports. Handle bytes between detents (worn pots, mid-travel
/// samples) are clamped to the nearest detent, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive)]
#[repr(u8)]
pub enum HandleState {
    EmergencyBrake = 0x00,
    Brake8 = 0x05,
    Brake7 = 0x13,
    Brake6 = 0x20,
    Brake5 = 0x2e,
    Brake4 = 0x3c,
    Brake3 = 0x49,
    Brake2 = 0x57,
    Brake1 = 0x65,
    Center = 0x80,
    Power1 = 0x9f,
    Power2 = 0xb7,
    Power3 = 0xce,
    Power4 = 0xe6,
    Power5 = 0xff,
}

/// All detents in ascending raw-byte order.
pub const DETENTS: [HandleState; 15] = [
    HandleState::EmergencyBrake,
    HandleState::Brake8,
    HandleState::Brake7,
    HandleState::Brake6,
    HandleState::Brake5,
    HandleState::Brake4,
    HandleState::Brake3,
    HandleState::Brake2,
    HandleState::Brake1,
    HandleState::Center,
    HandleState::Power1,
    HandleState::Power2,
    HandleState::Power3,
    HandleState::Power4,
    HandleState::Power5,
];

impl HandleState {
    /// Decodes a raw handle byte. Exact detent values map directly; anything
    /// else clamps to the nearest detent (ties resolve toward the brake side).
    pub fn from_raw(raw: u8) -> Self {
        if let Some(state) = num::FromPrimitive::from_u8(raw) {
            return state;
        }

        let mut nearest = HandleState::EmergencyBrake;
        let mut best = u8::MAX;
        for &detent in &DETENTS {
            let distance = (detent as u8).abs_diff(raw);
            if distance < best {
                nearest = detent;
                best = distance;
            }
        }
        debug!("handle byte {raw:#04x} clamped to {nearest:?}");
        nearest
    }
}

/// Hat switch positions, clockwise from Up. 0x0f means released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum HatState {
    Up = 0x00,
    UpRight = 0x01,
    Right = 0x02,
    DownRight = 0x03,
    Down = 0x04,
    DownLeft = 0x05,
    Left = 0x06,
    UpLeft = 0x07,
    None = 0x0f,
}

impl HatState {
    /// Decodes the low nibble of the hat byte. Nibble values outside the
    /// eight directions are reported as released.
    pub fn from_nibble(raw: u8) -> Self {
        num::FromPrimitive::from_u8(raw & MASK_HAT).unwrap_or(HatState::None)
    }

    pub fn is_leftward(self) -> bool {
        matches!(self, HatState::UpLeft | HatState::Left | HatState::DownLeft)
    }

    pub fn is_rightward(self) -> bool {
        matches!(self, HatState::UpRight | HatState::Right | HatState::DownRight)
    }

    pub fn is_upward(self) -> bool {
        matches!(self, HatState::UpLeft | HatState::Up | HatState::UpRight)
    }

    pub fn is_downward(self) -> bool {
        matches!(self, HatState::DownLeft | HatState::Down | HatState::DownRight)
    }
}

/// Primary buttons by bit index in the button bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Button {
    Y = 0,
    B = 1,
    A = 2,
    X = 3,
    L = 4,
    R = 5,
    Zl = 6,
    Zr = 7,
}

/// Secondary buttons by bitmap mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SecondaryButton {
    Minus = 0x01,
    Plus = 0x02,
    Home = 0x10,
    Camera = 0x20,
}

impl SecondaryButton {
    pub fn is_down(self, bitmap: u8) -> bool {
        bitmap & self as u8 != 0
    }
}

/// Semantic view of one raw report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub handle: HandleState,
    pub hat: HatState,
    pub buttons: u8,
    pub secondary: u8,
}

impl ControllerSnapshot {
    /// Pure decode of a fixed-length report. Never fails: unknown handle
    /// bytes clamp to the nearest detent, unknown hat nibbles read as None.
    pub fn decode(report: &[u8; REPORT_LEN]) -> Self {
        Self {
            handle: HandleState::from_raw(report[IDX_HANDLE]),
            hat: HatState::from_nibble(report[IDX_HAT]),
            buttons: report[IDX_BUTTONS],
            secondary: report[IDX_SECONDARY],
        }
    }
}

/// Edge detector over controller snapshots. Emits events only for fields
/// that changed since the previous report; the first report after startup
/// reports every field so no initial state is missed.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<ControllerSnapshot>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Diffs `snapshot` against the last one seen and returns the resulting
    /// events in delivery order: hat, secondary buttons, primary buttons
    /// (lowest bit first), handle last.
    pub fn update(&mut self, snapshot: ControllerSnapshot) -> Vec<ControlEvent> {
        let last = self.last;
        let mut events = Vec::new();

        if last.map(|l| l.hat) != Some(snapshot.hat) {
            events.push(ControlEvent::HatChanged(snapshot.hat));
        }

        if last.map(|l| l.secondary) != Some(snapshot.secondary) {
            events.push(ControlEvent::SecondaryButtons(snapshot.secondary));
        }

        // On the first report every bit is treated as an edge, so held
        // buttons present at startup still produce their Down events.
        let before = match last {
            Some(l) => l.buttons,
            None => !snapshot.buttons,
        };
        let changed = before ^ snapshot.buttons;
        for bit in 0..8 {
            if changed & (1 << bit) != 0 {
                if snapshot.buttons & (1 << bit) != 0 {
                    events.push(ControlEvent::ButtonDown(bit));
                } else {
                    events.push(ControlEvent::ButtonUp(bit));
                }
            }
        }

        // Handle last: consumers see positional context before the
        // highest-rate, most latency-sensitive signal.
        if last.map(|l| l.handle) != Some(snapshot.handle) {
            events.push(ControlEvent::HandleChanged(snapshot.handle));
        }

        self.last = Some(snapshot);
        events
    }
}
