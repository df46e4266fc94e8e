use crate::catalog::PresetCatalog;
use crate::state::DeviceState;
use crate::synth::SynthCmd;

/// The ten user-facing mixer slots: slot 0 is the drum lane on physical
/// channel 9 ("MIDI channel 10"), slots 1-9 are melodic on channels 0-8.
pub const LOGICAL_CHANNELS: u8 = 10;

pub const DRUM_CHANNEL: u8 = 9;

pub fn physical_channel(logical: u8) -> u8 {
    if logical == 0 { DRUM_CHANNEL } else { logical - 1 }
}

/// What one routed MIDI message amounts to.
pub struct Routed {
    pub commands: Vec<SynthCmd>,
    /// True when the message changed Device State (snapshot flush required).
    pub publish: bool,
}

/// Interpret a raw MIDI message against the current state.
///
/// Program changes are only routed once a soundfont is loaded; everything
/// else passes through unconditionally. Unrecognized status bytes are no-ops.
pub fn route(
    st: &mut DeviceState,
    raw: [u8; 3],
    catalog: &PresetCatalog,
    bank_loaded: bool,
) -> Routed {
    let status = raw[0] & 0xF0;
    let channel = raw[0] & 0x0F;
    let d1 = raw[1];
    let d2 = raw[2];

    let mut commands = Vec::new();
    let mut publish = false;

    match status {
        0x90 if d2 > 0 => {
            commands.push(SynthCmd::NoteOn { channel, key: d1, velocity: d2 });
        }
        0x90 | 0x80 => {
            commands.push(SynthCmd::NoteOff { channel, key: d1 });
        }
        0xB0 => {
            commands.push(SynthCmd::Cc { channel, controller: d1, value: d2 });
            if d1 == 7 {
                // Keep the mixer view in sync when the keyboard sends CC7
                st.channel_volumes[channel as usize] = d2.min(127);
                publish = true;
            }
        }
        0xE0 => {
            let value = (((d2 as i16) << 7) | d1 as i16) - 8192;
            commands.push(SynthCmd::PitchBend { channel, value });
        }
        0xC0 if bank_loaded => {
            let bank: u16 = if channel == DRUM_CHANNEL { 128 } else { 0 };
            commands.push(SynthCmd::Program { channel, bank, program: d1 });
            let name = catalog
                .get(bank, d1 as u16)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Patch {d1}"));
            st.channel_presets.insert(channel, name);
            publish = true;
        }
        _ => {}
    }

    Routed { commands, publish }
}

/// Rebuild the preset assignment for all ten logical channels.
///
/// Runs after every soundfont load and on an explicit playback Stop. The drum
/// lane takes program 0 of bank 128 (falling back to 127, then the main
/// bank); melodic lanes take the Nth lowest program of the main bank. With no
/// catalog every channel gets a placeholder name and no program commands are
/// issued.
pub fn assign_presets(st: &mut DeviceState, catalog: &PresetCatalog) -> Vec<SynthCmd> {
    st.channel_presets.clear();

    if catalog.is_empty() {
        for ch in 0..16u8 {
            st.channel_presets.insert(ch, "Generic Patch".to_string());
        }
        return Vec::new();
    }

    let banks = catalog.banks();
    let main_bank = if banks.contains(&0) {
        0
    } else {
        banks.first().copied().unwrap_or(0)
    };
    let drum_bank = if banks.contains(&128) {
        128
    } else if banks.contains(&127) {
        127
    } else {
        main_bank
    };

    let mut commands = Vec::new();

    commands.push(SynthCmd::Program { channel: DRUM_CHANNEL, bank: drum_bank, program: 0 });
    let drum_name = catalog
        .get(drum_bank, 0)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Drums".to_string());
    st.channel_presets.insert(DRUM_CHANNEL, drum_name);

    let bank_programs = catalog.programs_in(main_bank);
    for logical in 1..LOGICAL_CHANNELS {
        let channel = physical_channel(logical);
        let program = bank_programs
            .get(logical as usize - 1)
            .copied()
            .unwrap_or(0);
        commands.push(SynthCmd::Program {
            channel,
            bank: main_bank,
            program: program as u8,
        });
        let name = catalog
            .get(main_bank, program)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Patch {program}"));
        st.channel_presets.insert(channel, name);
    }

    commands
}
