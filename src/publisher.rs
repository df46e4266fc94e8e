use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

use crate::router::{LOGICAL_CHANNELS, physical_channel};
use crate::state::{DeviceState, Mode};

/// The record the remote companion consumes. Field names and shapes are the
/// wire contract; the companion renders exactly this.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub mode: String,
    pub index: usize,
    pub files: Vec<String>,
    pub msg: String,
    pub battery: String,
    pub is_eco: bool,
    pub rename_tmp: String,
    pub volume: u8,
    pub bpm: u16,
    pub metronome_on: bool,
    pub metro_vol: u8,
    pub mixer_idx: u8,
    pub is_adjusting: bool,
}

/// Build the snapshot for the current state.
///
/// The `files` list is context dependent: mixer rows, the rename overlay
/// pair, empty for modes the companion renders itself, else the browse
/// entries.
pub fn snapshot(st: &DeviceState, battery: String) -> Snapshot {
    let mut index = st.selected_index;
    let files = match st.mode {
        Mode::Rename => {
            index = 1;
            vec![
                format!("Building: {}", st.rename_buffer),
                format!("Char: {}", crate::menu::palette_label(st.rename_cursor)),
            ]
        }
        Mode::Mixer => {
            index = st.mixer_selected_channel as usize;
            (0..LOGICAL_CHANNELS)
                .map(|logical| {
                    let ch = physical_channel(logical);
                    let name = st
                        .channel_presets
                        .get(&ch)
                        .map(String::as_str)
                        .unwrap_or_default();
                    let name = if name.is_empty() {
                        format!("CH {ch}")
                    } else {
                        name.chars().take(10).collect()
                    };
                    let vol = st.channel_volumes[ch as usize];
                    format!("{logical}: {name} ({vol}%)")
                })
                .collect()
        }
        Mode::Volume | Mode::Metronome => Vec::new(),
        _ => {
            if st.entries.is_empty() {
                vec!["No Files".to_string()]
            } else {
                st.entries.clone()
            }
        }
    };

    Snapshot {
        mode: st.mode.label().to_string(),
        index,
        files,
        msg: st.toast().to_string(),
        battery,
        is_eco: st.low_power_mode,
        rename_tmp: st.rename_buffer.clone(),
        volume: st.master_volume,
        bpm: st.tempo_bpm,
        metronome_on: st.metronome_on,
        metro_vol: st.metronome_click_volume,
        mixer_idx: st.mixer_selected_channel,
        is_adjusting: st.adjusting,
    }
}

/// Writes snapshots where the remote companion reads them.
///
/// Each publish goes to a sibling temp file first and is renamed over the
/// target, so a reader never observes a half-written record.
pub struct Publisher {
    path: PathBuf,
}

impl Publisher {
    pub fn new(path: PathBuf) -> Self {
        Publisher { path }
    }

    pub fn publish(&self, snap: &Snapshot) -> anyhow::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            serde_json::to_writer(&file, snap)?;
            file.sync_all().ok();
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("publish {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MAIN_MENU;

    #[test]
    fn main_menu_snapshot_carries_entries() {
        let st = DeviceState::new();
        let snap = snapshot(&st, "0:00".into());
        assert_eq!(snap.mode, "main screen");
        assert_eq!(snap.files, MAIN_MENU.to_vec());
        assert_eq!(snap.index, 0);
        assert_eq!(snap.msg, "");
        assert_eq!(snap.volume, 70);
    }

    #[test]
    fn empty_browse_shows_placeholder() {
        let mut st = DeviceState::new();
        st.mode = Mode::MidiFileBrowse;
        st.entries.clear();
        let snap = snapshot(&st, "0:00".into());
        assert_eq!(snap.files, vec!["No Files".to_string()]);
    }

    #[test]
    fn overlay_modes_send_no_list() {
        let mut st = DeviceState::new();
        st.mode = Mode::Volume;
        assert!(snapshot(&st, "0:00".into()).files.is_empty());
        st.mode = Mode::Metronome;
        assert!(snapshot(&st, "0:00".into()).files.is_empty());
    }

    #[test]
    fn mixer_rows_use_preset_names_and_volumes() {
        let mut st = DeviceState::new();
        st.mode = Mode::Mixer;
        st.mixer_selected_channel = 3;
        st.channel_presets.insert(9, "Standard Drum Kit".to_string());
        st.channel_volumes[9] = 90;
        let snap = snapshot(&st, "0:00".into());
        assert_eq!(snap.index, 3);
        assert_eq!(snap.files.len(), 10);
        // Name truncated to 10 chars
        assert_eq!(snap.files[0], "0: Standard D (90%)");
        // Channel without a preset falls back to its number
        assert_eq!(snap.files[1], "1: CH 0 (100%)");
    }

    #[test]
    fn rename_overlay_shows_buffer_and_cursor() {
        let mut st = DeviceState::new();
        st.mode = Mode::Rename;
        st.rename_buffer = "song".to_string();
        st.rename_cursor = 1; // 'A'
        let snap = snapshot(&st, "0:00".into());
        assert_eq!(snap.index, 1);
        assert_eq!(snap.files, vec!["Building: song".to_string(), "Char: A".to_string()]);
        assert_eq!(snap.rename_tmp, "song");
    }

    #[test]
    fn toast_clears_after_window() {
        let mut st = DeviceState::new();
        st.set_toast("Renamed");
        assert_eq!(snapshot(&st, "0:00".into()).msg, "Renamed");
        st.expire_toast();
        assert_eq!(snapshot(&st, "0:00".into()).msg, "");
    }

    #[test]
    fn publish_is_atomic_under_concurrent_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monkey_state.json");
        let publisher = Publisher::new(path.clone());

        let st = DeviceState::new();
        publisher.publish(&snapshot(&st, "0:00".into())).unwrap();

        let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let reader_stop = stop.clone();
        let reader_path = path.clone();
        let reader = std::thread::spawn(move || {
            let mut seen = 0usize;
            while !reader_stop.load(std::sync::atomic::Ordering::Relaxed) {
                let data = std::fs::read(&reader_path).expect("state file vanished");
                serde_json::from_slice::<serde_json::Value>(&data)
                    .expect("observed a torn snapshot");
                seen += 1;
            }
            seen
        });

        for i in 0..500 {
            let mut st = DeviceState::new();
            st.master_volume = (i % 101) as u8;
            st.set_toast(format!("write {i}"));
            publisher.publish(&snapshot(&st, "0:00".into())).unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(reader.join().unwrap() > 0);
    }
}
