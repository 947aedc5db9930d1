pub mod controls;
pub mod events;
pub mod midi;
pub mod speed;
pub mod state;
