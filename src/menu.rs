use std::path::PathBuf;

use crate::config::Library;
use crate::router::physical_channel;
use crate::state::{ControlEvent, DeviceState, FILE_ACTIONS, Mode};
use crate::synth::SynthCmd;

/// Side effects a transition asks the actor to carry out.
///
/// Quick ones (synth commands, mixer save) run on the actor; the long ones
/// (font load, delete, playback) are forwarded to the job worker and come
/// back as `JobDone` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Synth(SynthCmd),
    LoadFont(PathBuf),
    Play(PathBuf),
    StopPlayback,
    Delete(PathBuf),
    ToggleRecord,
    /// New low-power value, already applied to state.
    SetPowerProfile(bool),
    Shutdown,
    SaveMixer,
    OpenMidiPort(String),
    /// Fill the browse list with the discovered MIDI input ports.
    ScanMidiPorts,
}

/// Read-only context the state machine consults while transitioning.
pub struct MenuCtx<'a> {
    pub lib: &'a Library,
    pub bank_loaded: bool,
}

/// Character palette for Rename mode: space, A-Z, a-z, 0-9, '_', '-', then
/// the OK sentinel that commits.
pub const PALETTE_LEN: usize = 66;
const OK_INDEX: usize = PALETTE_LEN - 1;

pub fn palette_char(index: usize) -> Option<char> {
    match index {
        0 => Some(' '),
        1..=26 => Some((b'A' + (index - 1) as u8) as char),
        27..=52 => Some((b'a' + (index - 27) as u8) as char),
        53..=62 => Some((b'0' + (index - 53) as u8) as char),
        63 => Some('_'),
        64 => Some('-'),
        _ => None,
    }
}

pub fn palette_label(index: usize) -> String {
    match palette_char(index) {
        Some(c) => c.to_string(),
        None => "OK".to_string(),
    }
}

/// Apply one control event. Never fails; events that make no sense in the
/// current mode fall through as no-ops.
pub fn apply(st: &mut DeviceState, event: ControlEvent, ctx: &MenuCtx) -> Vec<Effect> {
    match event {
        ControlEvent::Up => scroll(st, -1),
        ControlEvent::Down => scroll(st, 1),
        ControlEvent::Select => select(st, ctx),
        ControlEvent::Back => back(st, ctx),
    }
}

fn cycle(index: usize, len: usize, dir: i32) -> usize {
    if len == 0 {
        return 0;
    }
    if dir < 0 {
        (index + len - 1) % len
    } else {
        (index + 1) % len
    }
}

fn step(value: i32, delta: i32, lo: i32, hi: i32) -> i32 {
    (value + delta).clamp(lo, hi)
}

fn scroll(st: &mut DeviceState, dir: i32) -> Vec<Effect> {
    match st.mode {
        Mode::MainMenu
        | Mode::SoundFontBrowse
        | Mode::MidiFileBrowse
        | Mode::MidiKeyboard
        | Mode::FileAction => {
            if st.entries.is_empty() {
                return Vec::new();
            }
            st.selected_index = cycle(st.selected_index, st.entries.len(), dir);
            Vec::new()
        }
        Mode::Volume => {
            st.master_volume = step(st.master_volume as i32, dir * -5, 0, 100) as u8;
            vec![Effect::Synth(SynthCmd::Gain(st.master_volume))]
        }
        Mode::Metronome => {
            if !st.adjusting {
                st.selected_index = cycle(st.selected_index, 3, dir);
                Vec::new()
            } else if st.selected_index == 1 {
                st.tempo_bpm = step(st.tempo_bpm as i32, dir * -2, 40, 250) as u16;
                Vec::new()
            } else if st.selected_index == 2 {
                st.metronome_click_volume =
                    step(st.metronome_click_volume as i32, dir * -5, 0, 127) as u8;
                vec![Effect::Synth(SynthCmd::Cc {
                    channel: 9,
                    controller: 7,
                    value: st.metronome_click_volume,
                })]
            } else {
                Vec::new()
            }
        }
        Mode::Mixer => {
            if !st.adjusting {
                st.mixer_selected_channel =
                    cycle(st.mixer_selected_channel as usize, 10, dir) as u8;
                Vec::new()
            } else {
                let channel = physical_channel(st.mixer_selected_channel);
                let vol = step(
                    st.channel_volumes[channel as usize] as i32,
                    dir * -5,
                    0,
                    127,
                ) as u8;
                st.channel_volumes[channel as usize] = vol;
                vec![Effect::Synth(SynthCmd::Cc { channel, controller: 7, value: vol })]
            }
        }
        Mode::Rename => {
            st.rename_cursor = cycle(st.rename_cursor, PALETTE_LEN, dir);
            Vec::new()
        }
    }
}

fn select(st: &mut DeviceState, ctx: &MenuCtx) -> Vec<Effect> {
    match st.mode {
        Mode::Mixer => {
            st.adjusting = !st.adjusting;
            Vec::new()
        }
        Mode::Metronome => {
            if st.selected_index == 0 {
                st.metronome_on = !st.metronome_on;
                st.set_toast(if st.metronome_on { "Metro: ON" } else { "Metro: OFF" });
            } else {
                st.adjusting = !st.adjusting;
                st.set_toast(if st.adjusting { "ADJUSTING..." } else { "CONFIRMED" });
            }
            Vec::new()
        }
        Mode::Volume => {
            let level = st.master_volume;
            st.enter_main_menu();
            st.set_toast(format!("Master: {level}%"));
            Vec::new()
        }
        Mode::Rename => select_rename(st, ctx),
        _ if st.entries.is_empty() => Vec::new(),
        Mode::MainMenu => select_main_menu(st, ctx),
        Mode::SoundFontBrowse => {
            let path = st.paths[st.selected_index].clone();
            st.set_toast("Loading...");
            vec![Effect::LoadFont(path)]
        }
        Mode::MidiFileBrowse => {
            st.selected_file_path = st.paths[st.selected_index].clone();
            st.mode = Mode::FileAction;
            st.entries = FILE_ACTIONS.iter().map(|s| s.to_string()).collect();
            st.paths.clear();
            st.selected_index = 0;
            Vec::new()
        }
        Mode::FileAction => select_file_action(st, ctx),
        Mode::MidiKeyboard => {
            let name = st.entries[st.selected_index].clone();
            st.enter_main_menu();
            vec![Effect::OpenMidiPort(name)]
        }
    }
}

fn select_main_menu(st: &mut DeviceState, ctx: &MenuCtx) -> Vec<Effect> {
    let item = st.entries[st.selected_index].clone();
    match item.as_str() {
        "MIXER" => {
            enter_overlay(st, Mode::Mixer);
            Vec::new()
        }
        "METRONOME" => {
            enter_overlay(st, Mode::Metronome);
            Vec::new()
        }
        "VOLUME" => {
            enter_overlay(st, Mode::Volume);
            Vec::new()
        }
        "POWER" => {
            st.low_power_mode = !st.low_power_mode;
            st.set_toast(if st.low_power_mode { "Lean: ON (ECO)" } else { "Lean: OFF (MAX)" });
            vec![Effect::SetPowerProfile(st.low_power_mode)]
        }
        "RECORD" => vec![Effect::ToggleRecord],
        "SHUTDOWN" => vec![Effect::Shutdown],
        "SOUND FONT" => {
            let (entries, paths) = ctx.lib.soundfonts();
            enter_browse(st, Mode::SoundFontBrowse, entries, paths);
            Vec::new()
        }
        "MIDI FILE" => {
            let (entries, paths) = ctx.lib.midi_files();
            enter_browse(st, Mode::MidiFileBrowse, entries, paths);
            Vec::new()
        }
        "MIDI KEYBOARD" => {
            enter_browse(st, Mode::MidiKeyboard, Vec::new(), Vec::new());
            vec![Effect::ScanMidiPorts]
        }
        _ => Vec::new(),
    }
}

fn select_file_action(st: &mut DeviceState, ctx: &MenuCtx) -> Vec<Effect> {
    match st.entries[st.selected_index].as_str() {
        "PLAY" => {
            if !ctx.bank_loaded {
                st.set_toast("LOAD SF2 FIRST");
                Vec::new()
            } else if !st.selected_file_path.exists() {
                st.set_toast("File Not Found");
                Vec::new()
            } else {
                st.set_toast("Playing");
                vec![Effect::Play(st.selected_file_path.clone())]
            }
        }
        "STOP" => {
            st.set_toast("Stopped");
            vec![Effect::StopPlayback]
        }
        "RENAME" => {
            st.mode = Mode::Rename;
            st.rename_buffer = st
                .selected_file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            st.rename_cursor = 0;
            Vec::new()
        }
        "DELETE" => vec![Effect::Delete(st.selected_file_path.clone())],
        "BACK" => {
            enter_midi_browse(st, ctx);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn select_rename(st: &mut DeviceState, ctx: &MenuCtx) -> Vec<Effect> {
    match palette_char(st.rename_cursor) {
        Some(c) => {
            st.rename_buffer.push(c);
            Vec::new()
        }
        None => {
            debug_assert_eq!(st.rename_cursor, OK_INDEX);
            match ctx.lib.rename_midi(&st.selected_file_path, &st.rename_buffer) {
                Ok(target) => {
                    st.selected_file_path = target;
                    st.set_toast("Renamed");
                    st.rename_buffer.clear();
                    enter_midi_browse(st, ctx);
                }
                Err(e) => {
                    // Stay in Rename so the name can be fixed up
                    log::warn!("Rename failed: {e}");
                    st.set_toast("Error");
                }
            }
            Vec::new()
        }
    }
}

fn back(st: &mut DeviceState, ctx: &MenuCtx) -> Vec<Effect> {
    match st.mode {
        Mode::Mixer => {
            if st.adjusting {
                st.adjusting = false;
                Vec::new()
            } else {
                st.enter_main_menu();
                vec![Effect::SaveMixer]
            }
        }
        Mode::Metronome if st.adjusting => {
            st.adjusting = false;
            Vec::new()
        }
        Mode::Rename => {
            if st.rename_buffer.pop().is_none() {
                st.mode = Mode::FileAction;
                st.entries = FILE_ACTIONS.iter().map(|s| s.to_string()).collect();
                st.paths.clear();
                // Land on RENAME so it is obvious where we came from
                st.selected_index = 2;
            }
            Vec::new()
        }
        Mode::FileAction => {
            enter_midi_browse(st, ctx);
            Vec::new()
        }
        _ => {
            st.enter_main_menu();
            Vec::new()
        }
    }
}

fn enter_overlay(st: &mut DeviceState, mode: Mode) {
    st.mode = mode;
    st.entries.clear();
    st.paths.clear();
    st.selected_index = 0;
    st.adjusting = false;
}

fn enter_browse(st: &mut DeviceState, mode: Mode, entries: Vec<String>, paths: Vec<PathBuf>) {
    st.mode = mode;
    st.entries = entries;
    st.paths = paths;
    st.selected_index = 0;
}

/// Rescan the MIDI directory and show the file list.
pub fn enter_midi_browse(st: &mut DeviceState, ctx: &MenuCtx) {
    let (entries, paths) = ctx.lib.midi_files();
    enter_browse(st, Mode::MidiFileBrowse, entries, paths);
}
