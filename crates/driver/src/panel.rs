use log::info;

/// Boundary to the cab display. All calls are fire-and-forget and tolerate
/// redundant writes; `commit` mirrors the display's draw-then-push model.
pub(crate) trait ControlPanel: Send {
    fn show_speed(&mut self, magnitude: u8, commit: bool);
    fn show_rail(&mut self, is_left: bool, is_diverging: bool, commit: bool);
    fn show_drag(&mut self, level: u8);
}

/// Console rendition of the cab panel: a text gauge for speed plus one-line
/// rail and drag readouts.
pub(crate) struct ConsolePanel {
    max_speed: u8,
    pending_speed: u8,
    shown_speed: Option<u8>,
}

const GAUGE_WIDTH: usize = 32;

impl ConsolePanel {
    pub fn new(max_speed: u8) -> Self {
        Self {
            max_speed: max_speed.max(1),
            pending_speed: 0,
            shown_speed: None,
        }
    }
}

impl ControlPanel for ConsolePanel {
    fn show_speed(&mut self, magnitude: u8, commit: bool) {
        self.pending_speed = magnitude.min(self.max_speed);
        if !commit {
            return;
        }
        // The integrator refreshes every tick; only repaint on change.
        if self.shown_speed == Some(self.pending_speed) {
            return;
        }
        self.shown_speed = Some(self.pending_speed);

        let filled = usize::from(self.pending_speed) * GAUGE_WIDTH / usize::from(self.max_speed);
        info!(
            "speed {:>3} [{}{}]",
            self.pending_speed,
            "#".repeat(filled),
            "-".repeat(GAUGE_WIDTH - filled)
        );
    }

    fn show_rail(&mut self, is_left: bool, is_diverging: bool, commit: bool) {
        if !commit {
            return;
        }
        info!(
            "rail: {} / {}",
            if is_left { "reverse" } else { "forward" },
            if is_diverging { "diverging" } else { "through" }
        );
    }

    fn show_drag(&mut self, level: u8) {
        info!("drag level {level}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_clamped_to_the_gauge_range() {
        let mut panel = ConsolePanel::new(85);
        panel.show_speed(120, true);
        assert_eq!(panel.shown_speed, Some(85));
    }

    #[test]
    fn uncommitted_speed_is_not_painted() {
        let mut panel = ConsolePanel::new(85);
        panel.show_speed(10, false);
        assert_eq!(panel.shown_speed, None);
        panel.show_speed(10, true);
        assert_eq!(panel.shown_speed, Some(10));
    }
}
