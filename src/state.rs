use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::catalog::PresetCatalog;

/// Fixed main menu, in display order.
pub const MAIN_MENU: [&str; 9] = [
    "MIDI KEYBOARD",
    "SOUND FONT",
    "MIDI FILE",
    "MIXER",
    "RECORD",
    "METRONOME",
    "VOLUME",
    "POWER",
    "SHUTDOWN",
];

/// Submenu shown after selecting a MIDI file.
pub const FILE_ACTIONS: [&str; 5] = ["PLAY", "STOP", "RENAME", "DELETE", "BACK"];

/// How long a toast stays visible on the display and in snapshots.
pub const TOAST_WINDOW: Duration = Duration::from_secs(2);

/// Discrete control vocabulary shared by the front panel and the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Up,
    Down,
    Select,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    MainMenu,
    SoundFontBrowse,
    MidiFileBrowse,
    FileAction,
    Rename,
    MidiKeyboard,
    Mixer,
    Metronome,
    Volume,
}

impl Mode {
    /// Wire label used in published snapshots (fixed by the remote companion).
    pub fn label(self) -> &'static str {
        match self {
            Mode::MainMenu => "main screen",
            Mode::SoundFontBrowse => "SOUND FONT",
            Mode::MidiFileBrowse => "MIDI FILE",
            Mode::FileAction => "FILE ACTION",
            Mode::Rename => "RENAME",
            Mode::MidiKeyboard => "MIDI KEYBOARD",
            Mode::Mixer => "MIXER",
            Mode::Metronome => "METRONOME",
            Mode::Volume => "VOLUME",
        }
    }
}

/// Everything the serializing actor owns. One instance, boot to shutdown.
///
/// All other threads see either immutable snapshots (publisher) or command
/// channels; none hold a reference into this struct.
pub struct DeviceState {
    pub mode: Mode,
    /// Display labels for the current browse list.
    pub entries: Vec<String>,
    /// Resource ids parallel to `entries` (same length).
    pub paths: Vec<PathBuf>,
    pub selected_index: usize,

    pub master_volume: u8,
    /// Per physical MIDI channel, 0..=127.
    pub channel_volumes: [u8; 16],
    /// Physical channel → preset display name, rebuilt on bank load.
    pub channel_presets: HashMap<u8, String>,

    pub tempo_bpm: u16,
    pub metronome_on: bool,
    pub metronome_click_volume: u8,

    pub mixer_selected_channel: u8,
    /// "value edits row" vs "cursor navigates rows" (Mixer and Metronome).
    pub adjusting: bool,

    pub rename_buffer: String,
    pub rename_cursor: usize,

    toast: String,
    toast_issued_at: Instant,

    pub low_power_mode: bool,
    pub selected_file_path: PathBuf,
}

impl DeviceState {
    pub fn new() -> Self {
        DeviceState {
            mode: Mode::MainMenu,
            entries: MAIN_MENU.iter().map(|s| s.to_string()).collect(),
            paths: Vec::new(),
            selected_index: 0,
            master_volume: 70,
            channel_volumes: [100; 16],
            channel_presets: HashMap::new(),
            tempo_bpm: 120,
            metronome_on: false,
            metronome_click_volume: 80,
            mixer_selected_channel: 0,
            adjusting: false,
            rename_buffer: String::new(),
            rename_cursor: 0,
            toast: String::new(),
            toast_issued_at: Instant::now(),
            low_power_mode: false,
            selected_file_path: PathBuf::new(),
        }
    }

    pub fn enter_main_menu(&mut self) {
        self.mode = Mode::MainMenu;
        self.entries = MAIN_MENU.iter().map(|s| s.to_string()).collect();
        self.paths.clear();
        self.selected_index = 0;
    }

    pub fn set_toast(&mut self, msg: impl Into<String>) {
        self.toast = msg.into();
        self.toast_issued_at = Instant::now();
    }

    /// The toast text, or "" once its display window has elapsed.
    pub fn toast(&self) -> &str {
        if !self.toast.is_empty() && self.toast_issued_at.elapsed() < TOAST_WINDOW {
            &self.toast
        } else {
            ""
        }
    }

    #[cfg(test)]
    pub fn expire_toast(&mut self) {
        if let Some(t) = Instant::now().checked_sub(TOAST_WINDOW) {
            self.toast_issued_at = t;
        } else {
            self.toast.clear();
        }
    }
}

/// Completion notifications from the job worker (and the MIDI opener).
#[derive(Debug)]
pub enum JobDone {
    FontLoaded {
        path: PathBuf,
        catalog: Option<PresetCatalog>,
    },
    Deleted {
        path: PathBuf,
        error: Option<String>,
    },
    PlayFailed,
    MidiConnected(String),
}

/// The merged stream the serializing actor drains. Producers only enqueue.
#[derive(Debug)]
pub enum Event {
    Control(ControlEvent),
    /// Raw MIDI message as received; short messages are zero-padded.
    Midi([u8; 3]),
    Job(JobDone),
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_no_toast() {
        let st = DeviceState::new();
        assert_eq!(st.toast(), "");
    }

    #[test]
    fn toast_expires_after_window() {
        let mut st = DeviceState::new();
        st.set_toast("Saved Rec");
        assert_eq!(st.toast(), "Saved Rec");
        st.expire_toast();
        assert_eq!(st.toast(), "");
    }

    #[test]
    fn main_menu_reset() {
        let mut st = DeviceState::new();
        st.selected_index = 4;
        st.entries = vec!["x".into()];
        st.enter_main_menu();
        assert_eq!(st.mode, Mode::MainMenu);
        assert_eq!(st.selected_index, 0);
        assert_eq!(st.entries.len(), MAIN_MENU.len());
    }
}
