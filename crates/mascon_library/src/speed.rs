//! The fixed-period speed control loop.
//!
//! Each tick reads the shared cab state and moves the commanded speed
//! magnitude under the notch model: power notches converge on their target
//! with a proportional law, brake notches subtract a fixed amount on their
//! tick phase, coasting bleeds speed through the drag table, and the
//! emergency brake overrides everything at the maximum rate.

use crate::controls::HandleState;
use crate::state::{DRAG_MAX, TrainState};

/// Behavior category of a handle detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notch {
    Emergency,
    Brake(usize),
    Coast,
    Power(usize),
}

impl HandleState {
    /// Table index lookup for the integrator. Center is the neutral fallback
    /// category, so anything that is not an explicit power or brake detent
    /// coasts.
    pub fn notch(self) -> Notch {
        match self {
            HandleState::EmergencyBrake => Notch::Emergency,
            HandleState::Brake8 => Notch::Brake(7),
            HandleState::Brake7 => Notch::Brake(6),
            HandleState::Brake6 => Notch::Brake(5),
            HandleState::Brake5 => Notch::Brake(4),
            HandleState::Brake4 => Notch::Brake(3),
            HandleState::Brake3 => Notch::Brake(2),
            HandleState::Brake2 => Notch::Brake(1),
            HandleState::Brake1 => Notch::Brake(0),
            HandleState::Center => Notch::Coast,
            HandleState::Power1 => Notch::Power(0),
            HandleState::Power2 => Notch::Power(1),
            HandleState::Power3 => Notch::Power(2),
            HandleState::Power4 => Notch::Power(3),
            HandleState::Power5 => Notch::Power(4),
        }
    }
}

struct PowerNotch {
    /// Speed the notch converges on.
    target: u8,
    /// Proportional gain, scaled by remaining distance to the target.
    base_accel: u8,
    /// Acceleration is applied every `period` ticks.
    period: u32,
}

struct BrakeNotch {
    period: u32,
    decel: u8,
}

struct DragLevel {
    decel: u8,
    period: u32,
}

const POWER_NOTCH: [PowerNotch; 5] = [
    PowerNotch { target: 20, base_accel: 4, period: 5 },
    PowerNotch { target: 45, base_accel: 4, period: 3 },
    PowerNotch { target: 65, base_accel: 4, period: 2 },
    PowerNotch { target: 75, base_accel: 5, period: 1 },
    PowerNotch { target: 85, base_accel: 8, period: 1 },
];

// Index 8 is the emergency brake.
const BRAKE_NOTCH: [BrakeNotch; 9] = [
    BrakeNotch { period: 4, decel: 1 },
    BrakeNotch { period: 3, decel: 1 },
    BrakeNotch { period: 2, decel: 1 },
    BrakeNotch { period: 1, decel: 1 },
    BrakeNotch { period: 1, decel: 2 },
    BrakeNotch { period: 1, decel: 5 },
    BrakeNotch { period: 1, decel: 9 },
    BrakeNotch { period: 1, decel: 15 },
    BrakeNotch { period: 1, decel: 30 },
];

const ENV_RESISTANCE: [DragLevel; DRAG_MAX as usize + 1] = [
    DragLevel { decel: 0, period: 0 },
    DragLevel { decel: 1, period: 30 },
    DragLevel { decel: 1, period: 25 },
    DragLevel { decel: 1, period: 20 },
    DragLevel { decel: 1, period: 16 },
    DragLevel { decel: 1, period: 13 },
    DragLevel { decel: 1, period: 10 },
    DragLevel { decel: 1, period: 8 },
    DragLevel { decel: 1, period: 6 },
    DragLevel { decel: 1, period: 4 },
    DragLevel { decel: 1, period: 2 },
];

/// Tick-phase counter plus the integration step. One instance per control
/// loop; the commanded speed itself lives in [`TrainState`].
#[derive(Debug, Default)]
pub struct SpeedIntegrator {
    tick: u32,
}

impl SpeedIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// One control-loop step. Reads the handle notch, drag level, hold keys
    /// and current magnitude, and returns the next magnitude clamped to
    /// `0..=max_speed`. The caller stores it back and forwards the signed
    /// command every tick, changed or not.
    pub fn tick(&mut self, state: &TrainState) -> u8 {
        let current = state.speed();
        let max = state.max_speed();

        // Emergency brake wins unconditionally: no phase gating, no hold
        // keys, and the phase counter does not advance.
        if state.handle().notch() == Notch::Emergency {
            let braking = &BRAKE_NOTCH[8];
            return current.saturating_sub(braking.decel).min(max);
        }

        let mut speed = i16::from(current);

        match state.handle().notch() {
            Notch::Power(index) => {
                let notch = &POWER_NOTCH[index];
                if self.tick % notch.period == 0 {
                    let target = i16::from(notch.target);
                    let diff = target - speed;
                    if diff > 0 {
                        // Proportional to remaining distance; at least 1 so
                        // convergence terminates, at most `diff` so the
                        // target is never overshot.
                        let step = (i16::from(notch.base_accel) * diff / target).clamp(1, diff);
                        speed += step;
                    } else if diff < 0 {
                        // Downshifted power: ease back down to the target.
                        let step = (i16::from(notch.base_accel) * -diff / speed).clamp(1, -diff);
                        speed -= step;
                    }
                }
            }
            Notch::Brake(index) => {
                let notch = &BRAKE_NOTCH[index];
                if self.tick % notch.period == 0 {
                    speed -= i16::from(notch.decel);
                }
            }
            Notch::Coast => {
                let drag = state.drag().min(DRAG_MAX);
                if drag > 0 {
                    let resistance = &ENV_RESISTANCE[drag as usize];
                    if self.tick % resistance.period == 0 {
                        speed -= i16::from(resistance.decel);
                    }
                }
            }
            Notch::Emergency => unreachable!("handled above"),
        }

        if state.accel_held() {
            speed += i16::from(state.accel_step());
        }
        if state.brake_held() {
            speed -= i16::from(state.brake_step());
        }

        self.tick = self.tick.wrapping_add(1);
        speed.clamp(0, i16::from(max)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(handle: HandleState, drag: u8, speed: u8) -> TrainState {
        let state = TrainState::new(127);
        state.set_handle(handle);
        for _ in 0..drag {
            state.adjust_drag(1);
        }
        state.set_speed(speed);
        state
    }

    fn run(integrator: &mut SpeedIntegrator, state: &TrainState, ticks: usize) -> Vec<u8> {
        let mut trace = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let next = integrator.tick(state);
            state.set_speed(next);
            trace.push(next);
        }
        trace
    }

    #[test]
    fn coasting_with_no_drag_is_idempotent() {
        let state = state_with(HandleState::Center, 0, 37);
        let mut integrator = SpeedIntegrator::new();
        for _ in 0..100 {
            assert_eq!(integrator.tick(&state), 37);
        }
    }

    #[test]
    fn emergency_brake_stops_within_a_bounded_tick_count() {
        let state = state_with(HandleState::Power5, 0, 100);
        let mut integrator = SpeedIntegrator::new();
        state.set_handle(HandleState::EmergencyBrake);

        let trace = run(&mut integrator, &state, 5);
        assert_eq!(trace, vec![70, 40, 10, 0, 0]);
        for pair in trace.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn emergency_brake_ignores_hold_keys() {
        let state = state_with(HandleState::EmergencyBrake, 0, 60);
        state.set_accel_held(true);
        let mut integrator = SpeedIntegrator::new();
        let trace = run(&mut integrator, &state, 2);
        assert_eq!(trace, vec![30, 0]);
    }

    #[test]
    fn power3_converges_on_its_target_without_overshoot() {
        let state = state_with(HandleState::Power3, 0, 0);
        let mut integrator = SpeedIntegrator::new();

        let trace = run(&mut integrator, &state, 200);
        let target = 65;
        for &speed in &trace {
            assert!(speed <= target, "overshot to {speed}");
        }
        assert_eq!(*trace.last().unwrap(), target);
        // Once reached, the target holds.
        let reached = trace.iter().position(|&s| s == target).unwrap();
        assert!(trace[reached..].iter().all(|&s| s == target));
    }

    #[test]
    fn downshifted_power_eases_back_to_the_lower_target() {
        let state = state_with(HandleState::Power1, 0, 60);
        let mut integrator = SpeedIntegrator::new();

        let trace = run(&mut integrator, &state, 300);
        let target = 20;
        for pair in trace.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        for &speed in &trace {
            assert!(speed >= target, "undershot to {speed}");
        }
        assert_eq!(*trace.last().unwrap(), target);
    }

    #[test]
    fn brake_notches_follow_their_tick_phase() {
        // Brake4: decel 1 every tick.
        let state = state_with(HandleState::Brake4, 0, 10);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(run(&mut integrator, &state, 12), vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 0]);

        // Brake1: decel 1 every 4th tick.
        let state = state_with(HandleState::Brake1, 0, 10);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(run(&mut integrator, &state, 8), vec![9, 9, 9, 9, 8, 8, 8, 8]);
    }

    #[test]
    fn drag_bleeds_speed_only_while_coasting() {
        // Drag level 10: decel 1 every other tick.
        let state = state_with(HandleState::Center, 10, 6);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(run(&mut integrator, &state, 6), vec![5, 5, 4, 4, 3, 3]);

        // The same drag level under power does not bleed.
        let state = state_with(HandleState::Power5, 10, 85);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(run(&mut integrator, &state, 5), vec![85; 5]);
    }

    #[test]
    fn hold_keys_move_speed_while_coasting() {
        let state = state_with(HandleState::Center, 0, 10);
        state.set_accel_held(true);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(run(&mut integrator, &state, 3), vec![12, 14, 16]);

        state.set_accel_held(false);
        state.set_brake_held(true);
        assert_eq!(run(&mut integrator, &state, 3), vec![14, 12, 10]);
    }

    #[test]
    fn speed_is_clamped_to_the_ceiling_every_tick() {
        let state = state_with(HandleState::Center, 0, 80);
        state.set_max_speed(50);
        let mut integrator = SpeedIntegrator::new();
        assert_eq!(integrator.tick(&state), 50);
    }

    #[test]
    fn full_journey_rises_plateaus_and_stops() {
        let state = state_with(HandleState::Center, 0, 0);
        let mut integrator = SpeedIntegrator::new();

        // Stationary at Center.
        assert_eq!(run(&mut integrator, &state, 5), vec![0; 5]);

        // Power2 ramps up to its target and plateaus there.
        state.set_handle(HandleState::Power2);
        let rise = run(&mut integrator, &state, 120);
        for pair in rise.windows(2) {
            assert!(pair[1] >= pair[0], "speed fell during power");
        }
        assert_eq!(*rise.last().unwrap(), 45);

        // Coasting holds the plateau.
        state.set_handle(HandleState::Center);
        assert_eq!(run(&mut integrator, &state, 10), vec![45; 10]);

        // Brake4 bleeds one per tick.
        state.set_handle(HandleState::Brake4);
        let braking = run(&mut integrator, &state, 20);
        assert_eq!(*braking.last().unwrap(), 25);
        for pair in braking.windows(2) {
            assert_eq!(pair[0] - pair[1], 1);
        }

        // Emergency brake finishes the stop at the maximum rate.
        state.set_handle(HandleState::EmergencyBrake);
        assert_eq!(run(&mut integrator, &state, 2), vec![0, 0]);
    }
}
