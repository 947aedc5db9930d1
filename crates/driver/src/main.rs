mod panel;
mod settings;
mod train;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use clap::Parser;
use config::Config;
use hidapi::HidResult;
use log::{debug, info, warn};
use mascon_library::controls::{
    Button, ChangeDetector, ControllerSnapshot, HandleState, REPORT_LEN, SecondaryButton,
};
use mascon_library::events::ControlEvent;
use mascon_library::midi;
use mascon_library::speed::SpeedIntegrator;
use mascon_library::state::TrainState;
use midir::os::unix::VirtualInput;
use midir::{MidiInput, MidiInputConnection};

use crate::panel::{ConsolePanel, ControlPanel};
use crate::self_test::self_test;
use crate::settings::Settings;
use crate::train::{LogMotor, TrainOutput};

// Depth of the tick queue. Small on purpose: if the integrator ever falls
// behind, late ticks coalesce instead of piling up.
const TICK_QUEUE_DEPTH: usize = 2;

#[derive(Parser, Debug)]
#[clap(
    name = "Mascon cab-control console driver",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Args {
    #[clap(short, long, help = "Config file (see example_config.toml)")]
    config: Option<String>,
}

fn main() -> HidResult<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::builder();

    if let Some(config_fn) = args.config {
        cfg = cfg.add_source(config::File::with_name(config_fn.as_str()));
    }

    let cfg = cfg.build().expect("Can't create settings");
    let settings: Settings = cfg.try_deserialize().expect("Can't parse settings");

    settings.validate().unwrap();

    info!("Running with settings:");
    info!("{settings:?}");

    let state = Arc::new(TrainState::new(settings.speed_limit));
    let train = Arc::new(Mutex::new(TrainOutput::new(
        Box::new(LogMotor),
        Duration::from_millis(settings.point_pulse_ms),
    )));
    let panel = Arc::new(Mutex::new(ConsolePanel::new(settings.speed_limit)));

    // Run the startup sweep with a temporary lock on train and panel
    {
        let mut train_guard = train.lock().unwrap();
        let mut panel_guard = panel.lock().unwrap();
        self_test(&mut train_guard, &mut *panel_guard, settings.speed_limit);
    }

    let (event_tx, event_rx) = mpsc::channel::<ControlEvent>();

    // Control surface path: virtual MIDI input port feeding the event queue
    let midi_input = MidiInput::new(&settings.client_name).expect("Couldn't open MIDI input");
    let _midi_connection = create_midi_input(midi_input, &settings, event_tx.clone());

    // Single state-update consumer: every decoded event, from either input
    // path, is applied here and nowhere else.
    {
        let state = Arc::clone(&state);
        let train = Arc::clone(&train);
        let panel = Arc::clone(&panel);
        thread::spawn(move || {
            for event in event_rx {
                apply_event(&state, &train, &panel, event);
            }
        });
    }

    // Fixed-period tick source for the speed integrator.
    let (tick_tx, tick_rx) = mpsc::sync_channel::<()>(TICK_QUEUE_DEPTH);
    let tick_period = Duration::from_millis(settings.tick_period_ms);
    thread::spawn(move || {
        loop {
            thread::sleep(tick_period);
            // A full queue means the integrator is behind; drop the tick.
            let _ = tick_tx.try_send(());
        }
    });

    // Integrator task: one bounded step per tick, then forward the signed
    // command to the motor and the gauge even when unchanged.
    {
        let state = Arc::clone(&state);
        let train = Arc::clone(&train);
        let panel = Arc::clone(&panel);
        thread::spawn(move || {
            let mut integrator = SpeedIntegrator::new();
            for () in tick_rx {
                let next = integrator.tick(&state);
                state.set_speed(next);
                train.lock().unwrap().set_speed(state.signed_speed());
                panel.lock().unwrap().show_speed(next, true);
            }
        });
    }

    let api = hidapi::HidApi::new()?;
    let device = api.open(settings.vendor_id, settings.product_id)?;
    device.set_blocking_mode(false)?;

    info!("master controller open; polling");

    let mut detector = ChangeDetector::new();
    let mut buf = [0u8; 64];

    loop {
        let size = device.read_timeout(&mut buf, 10)?;
        if size < REPORT_LEN {
            continue;
        }

        let mut report = [0u8; REPORT_LEN];
        report.copy_from_slice(&buf[..REPORT_LEN]);
        let snapshot = ControllerSnapshot::decode(&report);

        for event in detector.update(snapshot) {
            if event_tx.send(event).is_err() {
                return Ok(());
            }
        }
    }
}

/// Creates the virtual MIDI input port. The callback wraps each message into
/// a USB-MIDI frame and pushes the decoded events onto the shared queue.
fn create_midi_input(
    midi_input: MidiInput,
    settings: &Settings,
    events: mpsc::Sender<ControlEvent>,
) -> MidiInputConnection<()> {
    midi_input
        .create_virtual(
            &settings.port_name_in,
            move |_timestamp, message, _data| {
                let Some(frame) = midi::frame_from_message(message) else {
                    return;
                };
                let mut decoded = Vec::new();
                midi::decode(&frame, &mut decoded);
                for event in decoded {
                    let _ = events.send(event);
                }
            },
            (),
        )
        .expect("Couldn't create virtual input port")
}

/// Applies one decoded event to the cab state and drives the panel and the
/// points actuator where the event calls for it.
fn apply_event(
    state: &TrainState,
    train: &Mutex<TrainOutput>,
    panel: &Mutex<ConsolePanel>,
    event: ControlEvent,
) {
    match event {
        ControlEvent::HatChanged(hat) => {
            // Direction and points are locked while moving.
            if state.is_running() {
                return;
            }
            if hat.is_leftward() {
                state.set_direction(true);
            } else if hat.is_rightward() {
                state.set_direction(false);
            }
            if hat.is_upward() {
                if state.set_diverging(true) {
                    train.lock().unwrap().drive_points(true);
                }
            } else if hat.is_downward() && state.set_diverging(false) {
                train.lock().unwrap().drive_points(false);
            }
            panel
                .lock()
                .unwrap()
                .show_rail(state.reversed(), state.diverging(), true);
        }
        ControlEvent::SecondaryButtons(bitmap) => {
            if SecondaryButton::Plus.is_down(bitmap) {
                state.adjust_drag(1);
            }
            if SecondaryButton::Minus.is_down(bitmap) {
                state.adjust_drag(-1);
            }
            if SecondaryButton::Home.is_down(bitmap) {
                state.reset_drag();
            }
            panel.lock().unwrap().show_drag(state.drag());
        }
        ControlEvent::ButtonDown(bit) => {
            let button: Option<Button> = num::FromPrimitive::from_u8(bit);
            debug!("button down: {button:?}");
        }
        ControlEvent::ButtonUp(bit) => {
            let button: Option<Button> = num::FromPrimitive::from_u8(bit);
            debug!("button up: {button:?}");
        }
        ControlEvent::HandleChanged(handle) => {
            debug!("handle -> {handle:?}");
            state.set_handle(handle);
        }
        ControlEvent::EmergencyStop => {
            warn!("emergency stop from control surface");
            state.set_handle(HandleState::EmergencyBrake);
        }
        ControlEvent::SwitchDirection => {
            if state.toggle_direction() {
                panel
                    .lock()
                    .unwrap()
                    .show_rail(state.reversed(), state.diverging(), true);
            }
        }
        ControlEvent::SwitchPoint => {
            if state.toggle_diverging() {
                train.lock().unwrap().drive_points(state.diverging());
                panel
                    .lock()
                    .unwrap()
                    .show_rail(state.reversed(), state.diverging(), true);
            }
        }
        ControlEvent::Accel(held) => state.set_accel_held(held),
        ControlEvent::Brake(held) => state.set_brake_held(held),
        ControlEvent::AccelSize(value) => state.set_accel_size(value),
        ControlEvent::BrakeSize(value) => state.set_brake_size(value),
        ControlEvent::DecelSize(value) => {
            let level = state.set_drag_from_cc(value);
            panel.lock().unwrap().show_drag(level);
        }
        ControlEvent::MaxSpeed(value) => state.set_max_speed(value),
    }
}
