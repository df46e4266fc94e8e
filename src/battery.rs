/// Remaining-runtime readout for the status bar and snapshots.
///
/// The actual UPS/ADC driver is a peripheral; the core only needs an `H:MM`
/// string. A box without a gauge runs fine and reports "0:00".
pub trait BatteryGauge: Send {
    fn time_left(&mut self, low_power: bool) -> String;
}

/// The degraded default: no sensor attached.
pub struct NoGauge;

impl BatteryGauge for NoGauge {
    fn time_left(&mut self, _low_power: bool) -> String {
        format_minutes(0)
    }
}

/// Format a minutes estimate as `H:MM`.
fn format_minutes(total_minutes: u32) -> String {
    format!("{}:{:02}", total_minutes / 60, total_minutes % 60)
}
