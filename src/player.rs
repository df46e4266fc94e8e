use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::Context;

/// MIDI-file playback through an external `aplaymidi` process targeting the
/// synth's ALSA sequencer port.
///
/// A new play supersedes the old one: the previous child is killed and reaped
/// first. There is no pause; Stop is the only other operation.
pub struct Player {
    child: Option<Child>,
    port_filter: String,
}

const FALLBACK_PORT: &str = "128:0";

impl Player {
    pub fn new(port_filter: impl Into<String>) -> Self {
        Player { child: None, port_filter: port_filter.into() }
    }

    pub fn play(&mut self, file: &Path) -> anyhow::Result<()> {
        self.stop();
        let port = self.discover_port();
        log::info!("Playing {} via port {port}", file.display());
        let child = Command::new("aplaymidi")
            .arg("--port")
            .arg(&port)
            .arg(file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn aplaymidi for {}", file.display()))?;
        self.child = Some(child);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("Playback already finished: {e}");
            }
            let _ = child.wait();
        }
    }

    fn discover_port(&self) -> String {
        let output = Command::new("aplaymidi").arg("-l").output();
        match output {
            Ok(out) => parse_port_listing(&String::from_utf8_lossy(&out.stdout), &self.port_filter),
            Err(e) => {
                log::warn!("aplaymidi -l failed ({e}); using {FALLBACK_PORT}");
                FALLBACK_PORT.to_string()
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pick the first port whose description matches the filter; without a match
/// the historical "128:0" fallback stands in.
fn parse_port_listing(listing: &str, filter: &str) -> String {
    listing
        .lines()
        .find(|line| line.contains(filter))
        .and_then(|line| line.split_whitespace().next())
        .map(|s| s.to_string())
        .unwrap_or_else(|| FALLBACK_PORT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
 Port    Client name                      Port name
 14:0    Midi Through                     Midi Through Port-0
129:0    FLUID Synth (qsynth)             Synth input port (qsynth:0)
";

    #[test]
    fn finds_the_synth_port() {
        assert_eq!(parse_port_listing(LISTING, "FLUID Synth"), "129:0");
    }

    #[test]
    fn no_match_falls_back() {
        assert_eq!(parse_port_listing(LISTING, "Timidity"), "128:0");
        assert_eq!(parse_port_listing("", "FLUID Synth"), "128:0");
    }
}
