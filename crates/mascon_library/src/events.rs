use crate::controls::{HandleState, HatState};

/// One decoded, debounced operator input, from either the master controller
/// or the MIDI control surface. Both decoders feed the same consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Direction/points hat moved to a new position.
    HatChanged(HatState),
    /// Secondary button bitmap changed; carries the new bitmap.
    SecondaryButtons(u8),
    /// Primary button at the given bit index was pressed.
    ButtonDown(u8),
    /// Primary button at the given bit index was released.
    ButtonUp(u8),
    /// Power/brake handle moved to a new detent.
    HandleChanged(HandleState),

    /// Pad surface: engage the emergency brake.
    EmergencyStop,
    /// Pad surface: flip running direction (only honored while stationary).
    SwitchDirection,
    /// Pad surface: throw the points (only honored while stationary).
    SwitchPoint,

    /// Keyboard surface: accelerate key held (true) or released (false).
    Accel(bool),
    /// Keyboard surface: brake key held (true) or released (false).
    Brake(bool),

    /// Control change 0..=127: step size for held accelerate keys.
    AccelSize(u8),
    /// Control change 0..=127: step size for held brake keys.
    BrakeSize(u8),
    /// Control change 0..=127: environmental drag level.
    DecelSize(u8),
    /// Control change 0..=127: ceiling for the commanded speed.
    MaxSpeed(u8),
}
