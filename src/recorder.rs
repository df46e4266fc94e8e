use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use midly::live::LiveEvent;
use midly::num::{u15, u24, u28};
use midly::{Format, Header, MetaMessage, Smf, Timing, TrackEvent, TrackEventKind};

/// Fixed recording clock: 480 ticks per beat at 500000 µs per beat (120 BPM),
/// independent of the live metronome tempo.
pub const TICKS_PER_BEAT: u16 = 480;
pub const MICROS_PER_BEAT: u64 = 500_000;

struct Session {
    track: Vec<TrackEvent<'static>>,
    last_event: Instant,
}

/// Timestamps incoming MIDI into a single track while armed.
///
/// `start` while armed and `stop` while idle are both no-ops; only channel
/// messages are captured.
pub struct Recorder {
    session: Option<Session>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder { session: None }
    }

    pub fn is_armed(&self) -> bool {
        self.session.is_some()
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        if self.session.is_none() {
            self.session = Some(Session {
                track: Vec::new(),
                last_event: now,
            });
        }
    }

    /// Disarm; with a destination the track is closed and written as a
    /// single-track SMF.
    pub fn stop(&mut self, destination: Option<&Path>) -> anyhow::Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let Some(path) = destination else {
            return Ok(());
        };

        session.track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        // Tempo meta so players honor the fixed recording clock
        session.track.insert(
            0,
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(MICROS_PER_BEAT as u32))),
            },
        );

        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(u15::new(TICKS_PER_BEAT)),
            },
            tracks: vec![session.track],
        };
        let mut buffer = Vec::new();
        smf.write(&mut buffer).map_err(|e| anyhow::anyhow!(e))?;
        std::fs::write(path, buffer).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn add_event(&mut self, raw: [u8; 3]) {
        self.add_event_at(raw, Instant::now());
    }

    fn add_event_at(&mut self, raw: [u8; 3], now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Ok(LiveEvent::Midi { channel, message }) = LiveEvent::parse(&raw[..message_len(raw[0])])
        else {
            return;
        };
        let elapsed = now.duration_since(session.last_event);
        let delta = elapsed.as_micros() as u64 * TICKS_PER_BEAT as u64 / MICROS_PER_BEAT;
        session.track.push(TrackEvent {
            delta: u28::new(delta.min(0x0FFF_FFFF) as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
        session.last_event = now;
    }
}

/// Data length of a channel message, status byte included.
fn message_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 2,
        _ => 3,
    }
}
