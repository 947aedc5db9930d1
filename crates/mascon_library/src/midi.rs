//! USB-MIDI event stream decoding for the control surface.
//!
//! The surface speaks two sub-protocols over the same 4-byte event framing,
//! told apart by channel: a pad bank firing one-shot actions, and a keyboard
//! plus encoder bank used for held accelerate/brake keys and continuous
//! control-change tuning.

use log::trace;

use crate::events::ControlEvent;

/// One USB-MIDI event packet: cable/CIN byte, status byte, two data bytes.
pub const PACKET_SIZE: usize = 4;

const PAD_CHANNEL: u8 = 8;
const CONTROL_CHANNEL: u8 = 1;

const CIN_NOTE_OFF: u8 = 0x08;
const CIN_NOTE_ON: u8 = 0x09;
const CIN_CONTROL_CHANGE: u8 = 0x0b;

const PAD_NOTE_EMERGENCY_STOP: u8 = 0x30;
const PAD_NOTE_SWITCH_DIRECTION: u8 = 0x32;
const PAD_NOTE_SWITCH_POINT: u8 = 0x34;

const CC_ACCEL_SIZE: u8 = 0x14;
const CC_BRAKE_SIZE: u8 = 0x15;
const CC_DECEL_SIZE: u8 = 0x16;
const CC_MAX_SPEED: u8 = 0x17;

/// Black keys sit on pitch classes C#, D#, F#, G#, A#. Any key on the
/// keyboard works as a hold button: black keys accelerate, white keys brake.
fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Decodes a buffer of USB-MIDI packets into control events. The buffer is
/// walked in fixed 4-byte frames; a trailing partial frame is ignored, and
/// frames from unknown channels or CINs are silently dropped. Malformed
/// input never halts decoding of the rest of the buffer.
pub fn decode(buffer: &[u8], events: &mut Vec<ControlEvent>) {
    for frame in buffer.chunks_exact(PACKET_SIZE) {
        let cin = frame[0] & 0x0f;
        let channel = frame[1] & 0x0f;

        if channel == PAD_CHANNEL && cin == CIN_NOTE_ON {
            match frame[2] {
                PAD_NOTE_EMERGENCY_STOP => events.push(ControlEvent::EmergencyStop),
                PAD_NOTE_SWITCH_DIRECTION => events.push(ControlEvent::SwitchDirection),
                PAD_NOTE_SWITCH_POINT => events.push(ControlEvent::SwitchPoint),
                other => trace!("unmapped pad note {other:#04x}"),
            }
        } else if channel == CONTROL_CHANNEL {
            match cin {
                CIN_CONTROL_CHANGE => match frame[2] {
                    CC_ACCEL_SIZE => events.push(ControlEvent::AccelSize(frame[3])),
                    CC_BRAKE_SIZE => events.push(ControlEvent::BrakeSize(frame[3])),
                    CC_DECEL_SIZE => events.push(ControlEvent::DecelSize(frame[3])),
                    CC_MAX_SPEED => events.push(ControlEvent::MaxSpeed(frame[3])),
                    other => trace!("unmapped control number {other:#04x}"),
                },
                CIN_NOTE_ON | CIN_NOTE_OFF => {
                    let held = cin == CIN_NOTE_ON;
                    if is_black_key(frame[2]) {
                        events.push(ControlEvent::Accel(held));
                    } else {
                        events.push(ControlEvent::Brake(held));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Wraps a plain serial MIDI message into a USB-MIDI event frame so both
/// transports share one decode path. The cable number is left zero; realtime
/// and truncated messages yield None.
pub fn frame_from_message(message: &[u8]) -> Option<[u8; PACKET_SIZE]> {
    if message.len() < 3 {
        return None;
    }
    let status = message[0];
    if status < 0x80 || status >= 0xf0 {
        return None;
    }
    Some([status >> 4, status, message[1], message[2]])
}
