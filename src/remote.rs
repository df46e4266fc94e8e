use std::path::PathBuf;

use crate::state::ControlEvent;

/// Filesystem mailbox fed by the remote companion: one well-known marker file
/// per discrete control event.
///
/// A marker is deleted before its event is dispatched, and only a successful
/// deletion dispatches, so no marker is ever consumed twice regardless of
/// what the handler does with it. Absence of markers is the steady state.
pub struct RemoteIntake {
    base_dir: PathBuf,
}

const MARKERS: [(&str, ControlEvent); 4] = [
    ("cmd_up", ControlEvent::Up),
    ("cmd_down", ControlEvent::Down),
    ("cmd_select", ControlEvent::Select),
    ("cmd_back", ControlEvent::Back),
];

impl RemoteIntake {
    pub fn new(base_dir: PathBuf) -> Self {
        RemoteIntake { base_dir }
    }

    /// Collect pending remote commands, consuming their markers.
    pub fn poll(&self) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        for (name, event) in MARKERS {
            let marker = self.base_dir.join(name);
            if marker.exists() {
                match std::fs::remove_file(&marker) {
                    Ok(()) => events.push(event),
                    Err(e) => log::warn!("Cannot consume marker {name}: {e}"),
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_is_consumed_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let intake = RemoteIntake::new(dir.path().to_path_buf());

        std::fs::write(dir.path().join("cmd_select"), b"1").unwrap();
        assert_eq!(intake.poll(), vec![ControlEvent::Select]);
        assert!(!dir.path().join("cmd_select").exists());
        assert!(intake.poll().is_empty());
    }

    #[test]
    fn multiple_markers_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        let intake = RemoteIntake::new(dir.path().to_path_buf());

        std::fs::write(dir.path().join("cmd_back"), b"1").unwrap();
        std::fs::write(dir.path().join("cmd_up"), b"1").unwrap();
        assert_eq!(intake.poll(), vec![ControlEvent::Up, ControlEvent::Back]);
    }

    #[test]
    fn unremovable_marker_is_not_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let intake = RemoteIntake::new(dir.path().to_path_buf());

        // A directory defeats remove_file; the event must not fire
        std::fs::create_dir(dir.path().join("cmd_select")).unwrap();
        assert!(intake.poll().is_empty());
    }

    #[test]
    fn empty_mailbox_is_the_steady_state() {
        let dir = tempfile::tempdir().unwrap();
        let intake = RemoteIntake::new(dir.path().to_path_buf());
        assert!(intake.poll().is_empty());
    }
}
