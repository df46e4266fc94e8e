use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use midir::{MidiOutput, MidiOutputConnection};

/// Commands understood by the synth sink.
///
/// The core never talks to an audio engine directly; everything it wants from
/// the synthesizer goes through this vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthCmd {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    Cc { channel: u8, controller: u8, value: u8 },
    /// Signed 14-bit bend, -8192..=8191.
    PitchBend { channel: u8, value: i16 },
    Program { channel: u8, bank: u16, program: u8 },
    /// Master gain, 0..=100.
    Gain(u8),
    AllSoundsOff { channel: u8 },
    /// Eco profile hint; only engine-backed sinks can honor it.
    Polyphony(u32),
    /// Silence everything and stop the sink thread.
    Shutdown,
}

enum Backend {
    MidiOut(MidiOutputConnection),
    Log,
}

/// Start the sink thread. Tries to open a MIDI output port whose name
/// contains `port_filter`; without one the sink degrades to logging only, so
/// the control core keeps running on a box with no synth attached.
pub fn spawn(port_filter: &str) -> (Sender<SynthCmd>, JoinHandle<()>) {
    let backend = match open_output(port_filter) {
        Ok(conn) => Backend::MidiOut(conn),
        Err(e) => {
            log::warn!("No synth output ({e}); synth commands will be logged only");
            Backend::Log
        }
    };
    let (tx, rx) = crossbeam_channel::bounded::<SynthCmd>(256);
    let handle = std::thread::spawn(move || run(backend, rx));
    (tx, handle)
}

fn open_output(port_filter: &str) -> anyhow::Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new("monkeybox")?;
    let ports = midi_out.ports();
    let port = ports
        .iter()
        .find(|p| {
            midi_out
                .port_name(p)
                .map(|n| n.contains(port_filter))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow::anyhow!("no MIDI output port matching '{port_filter}'"))?;
    let name = midi_out.port_name(port).unwrap_or_else(|_| "?".into());
    let conn = midi_out
        .connect(port, "monkeybox-synth")
        .map_err(|e| anyhow::anyhow!("connect to {name}: {e}"))?;
    log::info!("Synth sink connected to MIDI output: {name}");
    Ok(conn)
}

fn run(mut backend: Backend, rx: Receiver<SynthCmd>) {
    for cmd in rx.iter() {
        let shutdown = matches!(cmd, SynthCmd::Shutdown);
        match &mut backend {
            Backend::MidiOut(conn) => send_midi(conn, &cmd),
            Backend::Log => log::debug!("synth: {cmd:?}"),
        }
        if shutdown {
            break;
        }
    }
    log::info!("Synth sink stopped");
}

fn send_midi(conn: &mut MidiOutputConnection, cmd: &SynthCmd) {
    let mut send = |bytes: &[u8]| {
        if let Err(e) = conn.send(bytes) {
            log::warn!("Synth send failed: {e}");
        }
    };
    match *cmd {
        SynthCmd::NoteOn { channel, key, velocity } => {
            send(&[0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]);
        }
        SynthCmd::NoteOff { channel, key } => {
            send(&[0x80 | (channel & 0x0F), key & 0x7F, 0]);
        }
        SynthCmd::Cc { channel, controller, value } => {
            send(&[0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]);
        }
        SynthCmd::PitchBend { channel, value } => {
            let raw = (value.clamp(-8192, 8191) + 8192) as u16;
            send(&[
                0xE0 | (channel & 0x0F),
                (raw & 0x7F) as u8,
                (raw >> 7) as u8,
            ]);
        }
        SynthCmd::Program { channel, bank, program } => {
            // Bank 128 is the percussion bank, implicit on channel 10 for
            // GM sinks; only banks expressible as CC0 are sent.
            if bank < 128 {
                send(&[0xB0 | (channel & 0x0F), 0, bank as u8]);
            }
            send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
        }
        SynthCmd::Gain(level) => {
            // Universal master-volume SysEx, 14-bit value.
            let raw = (level.min(100) as u32 * 16383 / 100) as u16;
            send(&[
                0xF0,
                0x7F,
                0x7F,
                0x04,
                0x01,
                (raw & 0x7F) as u8,
                (raw >> 7) as u8,
                0xF7,
            ]);
        }
        SynthCmd::AllSoundsOff { channel } => {
            send(&[0xB0 | (channel & 0x0F), 120, 0]);
        }
        SynthCmd::Polyphony(_) => {
            // No wire equivalent; engine-backed sinks would honor it.
        }
        SynthCmd::Shutdown => {
            for ch in 0..16u8 {
                send(&[0xB0 | ch, 120, 0]);
            }
        }
    }
}
