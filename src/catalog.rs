use std::collections::BTreeMap;

/// Bank/program → preset-name lookup table built from a loaded soundfont.
///
/// Rebuilt from scratch on every bank load; consumers hold it read-only and
/// swap the whole table, never mutate entries in place.
#[derive(Debug, Default, Clone)]
pub struct PresetCatalog {
    presets: BTreeMap<(u16, u16), String>,
}

impl PresetCatalog {
    pub fn insert(&mut self, bank: u16, program: u16, name: impl Into<String>) {
        self.presets.insert((bank, program), name.into());
    }

    pub fn get(&self, bank: u16, program: u16) -> Option<&str> {
        self.presets.get(&(bank, program)).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Distinct banks, ascending.
    pub fn banks(&self) -> Vec<u16> {
        let mut banks: Vec<u16> = self.presets.keys().map(|&(b, _)| b).collect();
        banks.dedup();
        banks
    }

    /// Program numbers available in one bank, ascending.
    pub fn programs_in(&self, bank: u16) -> Vec<u16> {
        self.presets
            .keys()
            .filter(|&&(b, _)| b == bank)
            .map(|&(_, p)| p)
            .collect()
    }
}

impl FromIterator<((u16, u16), String)> for PresetCatalog {
    fn from_iter<T: IntoIterator<Item = ((u16, u16), String)>>(iter: T) -> Self {
        PresetCatalog {
            presets: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(entries: &[(u16, u16, &str)]) -> PresetCatalog {
        entries
            .iter()
            .map(|&(b, p, n)| ((b, p), n.to_string()))
            .collect()
    }

    #[test]
    fn banks_are_distinct_and_sorted() {
        let c = catalog(&[(128, 0, "Kick"), (0, 1, "Bass"), (0, 0, "Piano")]);
        assert_eq!(c.banks(), vec![0, 128]);
    }

    #[test]
    fn programs_in_bank_sorted() {
        let c = catalog(&[(0, 5, "E"), (0, 1, "B"), (8, 0, "X")]);
        assert_eq!(c.programs_in(0), vec![1, 5]);
        assert_eq!(c.programs_in(8), vec![0]);
        assert!(c.programs_in(1).is_empty());
    }

    #[test]
    fn lookup() {
        let c = catalog(&[(0, 3, "Strings")]);
        assert_eq!(c.get(0, 3), Some("Strings"));
        assert_eq!(c.get(1, 3), None);
    }
}
