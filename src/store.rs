use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

/// Mixer-settings store: channel number → volume, as JSON with string keys
/// (the on-disk format predates this implementation).
pub fn save_mixer(path: &Path, volumes: &[u8; 16]) -> anyhow::Result<()> {
    let map: BTreeMap<String, u8> = volumes
        .iter()
        .enumerate()
        .map(|(ch, &v)| (ch.to_string(), v))
        .collect();
    let json = serde_json::to_string(&map)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Load saved channel volumes; anything missing or unreadable falls back to
/// the default of 100 per channel.
pub fn load_mixer(path: &Path) -> [u8; 16] {
    let mut volumes = [100u8; 16];
    let Ok(data) = std::fs::read_to_string(path) else {
        return volumes;
    };
    match serde_json::from_str::<BTreeMap<String, u8>>(&data) {
        Ok(map) => {
            for (key, value) in map {
                if let Ok(ch) = key.parse::<usize>() {
                    if ch < 16 {
                        volumes[ch] = value.min(127);
                    }
                }
            }
        }
        Err(e) => log::warn!("Ignoring corrupt mixer store {}: {e}", path.display()),
    }
    volumes
}
