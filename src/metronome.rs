use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::synth::SynthCmd;

/// Settings the scheduler reads; pushed by the actor whenever they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetroSettings {
    pub on: bool,
    pub bpm: u16,
}

pub const CLICK_CHANNEL: u8 = 9;
pub const CLICK_KEY: u8 = 76;
pub const CLICK_VELOCITY: u8 = 110;

const HOLD: Duration = Duration::from_millis(50);
const MIN_GAP: Duration = Duration::from_millis(10);
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Pause between releasing one click and triggering the next.
///
/// Best-effort timing: the hold is subtracted from the beat period and the
/// result floored at 10 ms, so extreme tempos still tick.
pub fn gap_after_click(bpm: u16) -> Duration {
    let beat = Duration::from_secs_f64(60.0 / bpm.max(1) as f64);
    beat.checked_sub(HOLD).unwrap_or(Duration::ZERO).max(MIN_GAP)
}

/// Run the click loop on its own thread. Waits are channel receives with a
/// timeout, so settings changes take effect within one beat.
pub fn spawn(synth: Sender<SynthCmd>, settings_rx: Receiver<MetroSettings>) -> JoinHandle<()> {
    std::thread::spawn(move || run(synth, settings_rx))
}

fn run(synth: Sender<SynthCmd>, settings_rx: Receiver<MetroSettings>) {
    let mut settings = MetroSettings { on: false, bpm: 120 };
    loop {
        if !settings.on {
            match settings_rx.recv_timeout(IDLE_POLL) {
                Ok(s) => settings = s,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            continue;
        }

        if synth
            .send(SynthCmd::NoteOn {
                channel: CLICK_CHANNEL,
                key: CLICK_KEY,
                velocity: CLICK_VELOCITY,
            })
            .is_err()
        {
            return;
        }
        if !wait(&settings_rx, HOLD, &mut settings) {
            return;
        }
        let _ = synth.send(SynthCmd::NoteOff { channel: CLICK_CHANNEL, key: CLICK_KEY });

        if !wait(&settings_rx, gap_after_click(settings.bpm), &mut settings) {
            return;
        }
    }
}

/// Sleep for `duration`, absorbing any settings updates that arrive
/// meanwhile. Returns false when the settings channel is gone.
fn wait(rx: &Receiver<MetroSettings>, duration: Duration, settings: &mut MetroSettings) -> bool {
    let deadline = std::time::Instant::now() + duration;
    loop {
        let left = deadline.saturating_duration_since(std::time::Instant::now());
        if left.is_zero() {
            return true;
        }
        match rx.recv_timeout(left) {
            Ok(s) => *settings = s,
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_at_120_bpm_is_450_ms() {
        assert_eq!(gap_after_click(120), Duration::from_millis(450));
    }

    #[test]
    fn gap_never_drops_below_minimum() {
        // 250 BPM: beat = 240 ms, gap = 190 ms
        assert_eq!(gap_after_click(250), Duration::from_millis(190));
        // Absurd tempo still floors at 10 ms
        assert_eq!(gap_after_click(10_000), MIN_GAP);
    }

    #[test]
    fn clicks_flow_while_on() {
        let (synth_tx, synth_rx) = crossbeam_channel::unbounded();
        let (settings_tx, settings_rx) = crossbeam_channel::unbounded();
        let handle = spawn(synth_tx, settings_rx);

        settings_tx.send(MetroSettings { on: true, bpm: 250 }).unwrap();
        let first = synth_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("no click");
        assert_eq!(
            first,
            SynthCmd::NoteOn { channel: 9, key: 76, velocity: 110 }
        );
        let second = synth_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("no release");
        assert_eq!(second, SynthCmd::NoteOff { channel: 9, key: 76 });

        drop(settings_tx);
        handle.join().unwrap();
    }
}
