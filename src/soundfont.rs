use std::path::Path;

use anyhow::{Context, bail};

use crate::catalog::PresetCatalog;

/// Read the preset headers out of an SF2 soundfont.
///
/// Only the `phdr` chunk of the `pdta` list is consulted; sample data and
/// generators belong to the synth engine, not the control core.
pub fn load_catalog(path: &Path) -> anyhow::Result<PresetCatalog> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    parse_catalog(&data).with_context(|| format!("parse {}", path.display()))
}

const PHDR_RECORD: usize = 38;

fn parse_catalog(data: &[u8]) -> anyhow::Result<PresetCatalog> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"sfbk" {
        bail!("not an sfbk RIFF file");
    }

    let phdr = find_phdr(&data[12..]).ok_or_else(|| anyhow::anyhow!("no phdr chunk"))?;
    if phdr.len() % PHDR_RECORD != 0 || phdr.len() < PHDR_RECORD {
        bail!("malformed phdr chunk ({} bytes)", phdr.len());
    }

    let mut catalog = PresetCatalog::default();
    // Last record is the EOP terminator.
    for rec in phdr.chunks_exact(PHDR_RECORD).rev().skip(1) {
        let name = rec[..20]
            .split(|&b| b == 0)
            .next()
            .unwrap_or(&[])
            .iter()
            .map(|&b| b as char)
            .collect::<String>();
        let program = u16::from_le_bytes([rec[20], rec[21]]);
        let bank = u16::from_le_bytes([rec[22], rec[23]]);
        catalog.insert(bank, program, name.trim().to_string());
    }
    Ok(catalog)
}

/// Walk RIFF chunks looking for the phdr subchunk of the pdta list.
fn find_phdr(mut body: &[u8]) -> Option<&[u8]> {
    while body.len() >= 8 {
        let id = &body[0..4];
        let size = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
        let chunk = body.get(8..8 + size)?;
        if id == b"LIST" && chunk.get(0..4) == Some(b"pdta") {
            return find_subchunk(&chunk[4..], b"phdr");
        }
        // Chunks are word-aligned
        body = body.get(8 + size + (size & 1)..)?;
    }
    None
}

fn find_subchunk<'a>(mut body: &'a [u8], want: &[u8; 4]) -> Option<&'a [u8]> {
    while body.len() >= 8 {
        let id = &body[0..4];
        let size = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
        let chunk = body.get(8..8 + size)?;
        if id == want {
            return Some(chunk);
        }
        body = body.get(8 + size + (size & 1)..)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phdr_record(name: &str, bank: u16, program: u16) -> Vec<u8> {
        let mut rec = vec![0u8; PHDR_RECORD];
        rec[..name.len()].copy_from_slice(name.as_bytes());
        rec[20..22].copy_from_slice(&program.to_le_bytes());
        rec[22..24].copy_from_slice(&bank.to_le_bytes());
        rec
    }

    /// Minimal sfbk image: one pdta list holding a phdr chunk.
    fn sf2_image(presets: &[(&str, u16, u16)]) -> Vec<u8> {
        let mut phdr = Vec::new();
        for &(name, bank, program) in presets {
            phdr.extend(phdr_record(name, bank, program));
        }
        phdr.extend(phdr_record("EOP", 0, 0));

        let mut pdta = b"pdta".to_vec();
        pdta.extend(b"phdr");
        pdta.extend((phdr.len() as u32).to_le_bytes());
        pdta.extend(&phdr);

        let mut out = b"RIFF".to_vec();
        out.extend((4 + 8 + pdta.len() as u32).to_le_bytes());
        out.extend(b"sfbk");
        out.extend(b"LIST");
        out.extend((pdta.len() as u32).to_le_bytes());
        out.extend(&pdta);
        out
    }

    #[test]
    fn parses_preset_headers() {
        let img = sf2_image(&[("Piano", 0, 0), ("Bass", 0, 1), ("Kick", 128, 0)]);
        let catalog = parse_catalog(&img).unwrap();
        assert_eq!(catalog.get(0, 0), Some("Piano"));
        assert_eq!(catalog.get(0, 1), Some("Bass"));
        assert_eq!(catalog.get(128, 0), Some("Kick"));
        // EOP terminator is not a preset
        assert_eq!(catalog.banks(), vec![0, 128]);
    }

    #[test]
    fn rejects_non_soundfont() {
        assert!(parse_catalog(b"RIFF\x04\x00\x00\x00WAVE").is_err());
        assert!(parse_catalog(b"junk").is_err());
    }

    #[test]
    fn missing_phdr_is_an_error() {
        let mut img = b"RIFF".to_vec();
        img.extend(4u32.to_le_bytes());
        img.extend(b"sfbk");
        assert!(parse_catalog(&img).is_err());
    }

    #[test]
    fn load_catalog_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sf2");
        std::fs::write(&path, sf2_image(&[("Strings", 0, 3)])).unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.get(0, 3), Some("Strings"));
    }
}
