//! Shared cab state between the input consumers and the speed integrator.
//!
//! Every field is a word-sized atomic: each has a single writer (input side
//! or integrator), readers never block, and the integrator tick never waits
//! on input. Direction and points are guarded by the stationary rule; a
//! rejected write is normal operator behavior, not an error.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::controls::HandleState;

/// Highest drag level; matches the resistance table in [`crate::speed`].
pub const DRAG_MAX: u8 = 10;

/// Absolute PWM ceiling of the motor driver.
pub const SPEED_MAX: u8 = 127;

const DEFAULT_HOLD_STEP: u8 = 2;

pub struct TrainState {
    /// Hard ceiling from configuration; `max_speed` can never exceed it.
    limit: u8,

    handle: AtomicU8,
    drag: AtomicU8,
    reversed: AtomicBool,
    diverging: AtomicBool,
    speed: AtomicU8,
    max_speed: AtomicU8,

    accel_held: AtomicBool,
    brake_held: AtomicBool,
    accel_step: AtomicU8,
    brake_step: AtomicU8,
}

impl TrainState {
    pub fn new(speed_limit: u8) -> Self {
        let limit = speed_limit.min(SPEED_MAX);
        Self {
            limit,
            handle: AtomicU8::new(HandleState::Center as u8),
            drag: AtomicU8::new(0),
            reversed: AtomicBool::new(false),
            diverging: AtomicBool::new(false),
            speed: AtomicU8::new(0),
            max_speed: AtomicU8::new(limit),
            accel_held: AtomicBool::new(false),
            brake_held: AtomicBool::new(false),
            accel_step: AtomicU8::new(DEFAULT_HOLD_STEP),
            brake_step: AtomicU8::new(DEFAULT_HOLD_STEP),
        }
    }

    pub fn is_running(&self) -> bool {
        self.speed() > 0
    }

    pub fn handle(&self) -> HandleState {
        // Only valid discriminants are ever stored, so this is an exact match.
        HandleState::from_raw(self.handle.load(Ordering::SeqCst))
    }

    /// Always allowed: braking and power must never be blocked.
    pub fn set_handle(&self, handle: HandleState) {
        self.handle.store(handle as u8, Ordering::SeqCst);
    }

    pub fn reversed(&self) -> bool {
        self.reversed.load(Ordering::SeqCst)
    }

    /// Sets the running direction. Ignored while moving; returns whether the
    /// write was accepted.
    pub fn set_direction(&self, reversed: bool) -> bool {
        if self.is_running() {
            return false;
        }
        self.reversed.store(reversed, Ordering::SeqCst);
        true
    }

    pub fn toggle_direction(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.reversed.fetch_xor(true, Ordering::SeqCst);
        true
    }

    pub fn diverging(&self) -> bool {
        self.diverging.load(Ordering::SeqCst)
    }

    /// Selects the through or diverging route. Ignored while moving; returns
    /// whether the write was accepted so the caller can pulse the actuator.
    pub fn set_diverging(&self, diverging: bool) -> bool {
        if self.is_running() {
            return false;
        }
        self.diverging.store(diverging, Ordering::SeqCst);
        true
    }

    pub fn toggle_diverging(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.diverging.fetch_xor(true, Ordering::SeqCst);
        true
    }

    pub fn drag(&self) -> u8 {
        self.drag.load(Ordering::SeqCst)
    }

    /// Steps the drag level by ±1, clamped to `0..=DRAG_MAX`. Returns the
    /// new level.
    pub fn adjust_drag(&self, delta: i8) -> u8 {
        let current = self.drag();
        let next = current
            .saturating_add_signed(delta)
            .min(DRAG_MAX);
        self.drag.store(next, Ordering::SeqCst);
        next
    }

    pub fn reset_drag(&self) -> u8 {
        self.drag.store(0, Ordering::SeqCst);
        0
    }

    /// Maps a control-change value 0..=127 onto the drag scale.
    pub fn set_drag_from_cc(&self, value: u8) -> u8 {
        let level = (u16::from(value.min(127)) * u16::from(DRAG_MAX) / 127) as u8;
        self.drag.store(level, Ordering::SeqCst);
        level
    }

    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::SeqCst)
    }

    /// Commanded magnitude; written by the speed integrator only.
    pub fn set_speed(&self, magnitude: u8) {
        self.speed.store(magnitude.min(SPEED_MAX), Ordering::SeqCst);
    }

    /// Magnitude and direction combined into the motor-driver command.
    pub fn signed_speed(&self) -> i8 {
        let magnitude = self.speed().min(SPEED_MAX) as i8;
        if self.reversed() { -magnitude } else { magnitude }
    }

    pub fn max_speed(&self) -> u8 {
        self.max_speed.load(Ordering::SeqCst)
    }

    /// Adjusts the speed ceiling, capped at the configured limit.
    pub fn set_max_speed(&self, value: u8) {
        self.max_speed.store(value.min(self.limit), Ordering::SeqCst);
    }

    pub fn accel_held(&self) -> bool {
        self.accel_held.load(Ordering::SeqCst)
    }

    pub fn set_accel_held(&self, held: bool) {
        self.accel_held.store(held, Ordering::SeqCst);
    }

    pub fn brake_held(&self) -> bool {
        self.brake_held.load(Ordering::SeqCst)
    }

    pub fn set_brake_held(&self, held: bool) {
        self.brake_held.store(held, Ordering::SeqCst);
    }

    pub fn accel_step(&self) -> u8 {
        self.accel_step.load(Ordering::SeqCst)
    }

    pub fn brake_step(&self) -> u8 {
        self.brake_step.load(Ordering::SeqCst)
    }

    /// Control-change value 0..=127 scaled down to a per-tick PWM step.
    pub fn set_accel_size(&self, value: u8) {
        self.accel_step.store(hold_step(value), Ordering::SeqCst);
    }

    pub fn set_brake_size(&self, value: u8) {
        self.brake_step.store(hold_step(value), Ordering::SeqCst);
    }
}

fn hold_step(cc_value: u8) -> u8 {
    (cc_value / 8).max(1)
}
