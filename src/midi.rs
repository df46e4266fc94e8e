use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use midir::{MidiInput, MidiInputConnection};

use crate::state::{Event, JobDone};

/// Owns the (at most one) MIDI keyboard connection.
///
/// The input callback only enqueues raw bytes onto the actor channel; all
/// interpretation happens on the actor. Opening a port never blocks the
/// caller: the connect runs on a short-lived thread and reports back as a
/// job event.
pub struct MidiManager {
    sender: Sender<Event>,
    connection: Arc<Mutex<Option<MidiInputConnection<()>>>>,
}

impl MidiManager {
    pub fn new(sender: Sender<Event>) -> Self {
        MidiManager {
            sender,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Names of the currently available input ports.
    pub fn list_ports(&self) -> Vec<String> {
        let Ok(midi_in) = MidiInput::new("monkeybox") else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect()
    }

    /// Open the named port, replacing any existing connection. Returns
    /// immediately; success surfaces later as a `MidiConnected` job event.
    pub fn open_port_by_name_async(&self, name: String) {
        let sender = self.sender.clone();
        let slot = Arc::clone(&self.connection);
        std::thread::spawn(move || match connect(&name, sender.clone()) {
            Ok(conn) => {
                if let Ok(mut guard) = slot.lock() {
                    // Dropping the previous connection closes its port
                    *guard = Some(conn);
                }
                let _ = sender.send(Event::Job(JobDone::MidiConnected(name)));
            }
            Err(e) => log::warn!("Failed to open MIDI input {name}: {e}"),
        });
    }
}

fn connect(name: &str, sender: Sender<Event>) -> anyhow::Result<MidiInputConnection<()>> {
    let midi_in = MidiInput::new("monkeybox")?;
    let ports = midi_in.ports();
    let port = ports
        .iter()
        .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| anyhow::anyhow!("port not found: {name}"))?;

    let log_name = name.to_string();
    midi_in
        .connect(
            port,
            "monkeybox-in",
            move |_timestamp_us, bytes, _| {
                // Copy into a fixed [u8; 3]; longer messages (SysEx) are not
                // routed by this core
                if bytes.is_empty() || bytes.len() > 3 {
                    return;
                }
                let mut buf = [0u8; 3];
                buf[..bytes.len()].copy_from_slice(bytes);
                if sender.try_send(Event::Midi(buf)).is_err() {
                    log::warn!("Event channel full, dropping MIDI from {log_name}");
                }
            },
            (),
        )
        .map_err(|e| anyhow::anyhow!("connect to {name}: {e}"))
}
