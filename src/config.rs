use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;

/// Directory layout of the appliance. Loadable from a TOML file; defaults
/// match the deployed image.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command markers, mixer store and published state live here.
    pub base_dir: PathBuf,
    pub soundfont_dir: PathBuf,
    pub midi_dir: PathBuf,
    /// Substring match for the synth's MIDI output port.
    pub synth_port: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_dir: PathBuf::from("/home/pi/midifileplayer"),
            soundfont_dir: PathBuf::from("/home/pi/sf2"),
            midi_dir: PathBuf::from("/home/pi/midifiles"),
            synth_port: "FLUID Synth".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("read config {}", p.display()))?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.base_dir.join("monkey_state.json")
    }

    pub fn mixer_path(&self) -> PathBuf {
        self.base_dir.join("mixer_settings.json")
    }

    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        for dir in [&self.base_dir, &self.soundfont_dir, &self.midi_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn library(&self) -> Library {
        Library {
            soundfont_dir: self.soundfont_dir.clone(),
            midi_dir: self.midi_dir.clone(),
        }
    }
}

/// Flat, extension-filtered views of the soundfont and MIDI directories.
#[derive(Debug, Clone)]
pub struct Library {
    pub soundfont_dir: PathBuf,
    pub midi_dir: PathBuf,
}

impl Library {
    /// Soundfont listing: (display labels, paths), sorted by file name.
    pub fn soundfonts(&self) -> (Vec<String>, Vec<PathBuf>) {
        scan(&self.soundfont_dir, "sf2")
    }

    /// MIDI file listing: (display labels, paths), sorted by file name.
    pub fn midi_files(&self) -> (Vec<String>, Vec<PathBuf>) {
        scan(&self.midi_dir, "mid")
    }

    /// Destination path for a renamed or freshly recorded MIDI file.
    pub fn midi_target(&self, stem: &str) -> PathBuf {
        self.midi_dir.join(format!("{stem}.mid"))
    }

    /// Rename a MIDI file to `trim(stem) + ".mid"`. An existing target is a
    /// failure, never an overwrite.
    pub fn rename_midi(&self, from: &Path, stem: &str) -> anyhow::Result<PathBuf> {
        let target = self.midi_target(stem.trim());
        if target != from && target.exists() {
            bail!("{} already exists", target.display());
        }
        std::fs::rename(from, &target)
            .with_context(|| format!("rename {} -> {}", from.display(), target.display()))?;
        Ok(target)
    }
}

// Suffix match rather than Path::extension: a bare ".mid" (the empty-rename
// edge case) has no extension but must stay reachable in the browse list.
fn scan(dir: &Path, extension: &str) -> (Vec<String>, Vec<PathBuf>) {
    let suffix = format!(".{extension}");
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_ascii_lowercase().ends_with(&suffix))
                    .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            log::warn!("Cannot scan {}: {e}", dir.display());
            Vec::new()
        }
    };
    paths.sort();
    let labels = paths
        .iter()
        .map(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            name[..name.len() - suffix.len()].to_string()
        })
        .collect();
    (labels, paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(dir: &Path) -> Library {
        Library {
            soundfont_dir: dir.join("sf2"),
            midi_dir: dir.join("mid"),
        }
    }

    #[test]
    fn listings_are_filtered_and_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = library(tmp.path());
        std::fs::create_dir_all(&lib.midi_dir).unwrap();
        std::fs::write(lib.midi_dir.join("b.mid"), b"").unwrap();
        std::fs::write(lib.midi_dir.join("a.mid"), b"").unwrap();
        std::fs::write(lib.midi_dir.join("notes.txt"), b"").unwrap();

        let (labels, paths) = lib.midi_files();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(paths.len(), 2);

        // Missing soundfont dir degrades to an empty listing
        let (labels, paths) = lib.soundfonts();
        assert!(labels.is_empty() && paths.is_empty());
    }

    #[test]
    fn bare_extension_file_is_listed_with_empty_label() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = library(tmp.path());
        std::fs::create_dir_all(&lib.midi_dir).unwrap();
        std::fs::write(lib.midi_dir.join(".mid"), b"").unwrap();
        std::fs::write(lib.midi_dir.join("SHOUT.MID"), b"").unwrap();

        let (labels, paths) = lib.midi_files();
        assert_eq!(labels, vec!["", "SHOUT"]);
        assert_eq!(paths[0], lib.midi_dir.join(".mid"));
    }

    #[test]
    fn rename_refuses_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = library(tmp.path());
        std::fs::create_dir_all(&lib.midi_dir).unwrap();
        let a = lib.midi_dir.join("a.mid");
        let b = lib.midi_dir.join("b.mid");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();

        assert!(lib.rename_midi(&a, "b").is_err());
        assert!(a.exists());

        let renamed = lib.rename_midi(&a, " c ").unwrap();
        assert_eq!(renamed, lib.midi_dir.join("c.mid"));
        assert!(renamed.exists());
    }

    #[test]
    fn config_defaults_and_derived_paths() {
        let cfg = Config::load(None).unwrap();
        assert_eq!(
            cfg.state_path(),
            Path::new("/home/pi/midifileplayer/monkey_state.json")
        );
        assert_eq!(
            cfg.mixer_path(),
            Path::new("/home/pi/midifileplayer/mixer_settings.json")
        );
    }

    #[test]
    fn config_overrides_from_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("monkeybox.toml");
        std::fs::write(&path, "base_dir = \"/tmp/mb\"\nsynth_port = \"Timidity\"\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.base_dir, Path::new("/tmp/mb"));
        assert_eq!(cfg.synth_port, "Timidity");
        // Unset fields keep defaults
        assert_eq!(cfg.midi_dir, Path::new("/home/pi/midifiles"));
    }
}
