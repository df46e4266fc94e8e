use std::process::Command;

/// Peripheral power-profile bundle for eco mode. Every step is best-effort:
/// a dev machine without these sysfs knobs just logs and moves on.
pub fn apply_profile(low_power: bool) {
    let (tv, governor, led) = if low_power {
        ("-o", "powersave", "none")
    } else {
        ("-p", "ondemand", "mmc0")
    };
    run("tvservice", &[tv]);
    write_sysfs("/sys/devices/system/cpu/cpu0/cpufreq/scaling_governor", governor);
    write_sysfs("/sys/class/leds/ACT/trigger", led);
    log::info!("Power profile: {}", if low_power { "eco" } else { "max" });
}

/// Halt the machine. Terminal; only reached from the SHUTDOWN menu entry.
pub fn halt() {
    run("/sbin/poweroff", &[]);
}

fn run(program: &str, args: &[&str]) {
    match Command::new(program).args(args).output() {
        Ok(out) if !out.status.success() => {
            log::warn!("{program} exited with {}", out.status);
        }
        Ok(_) => {}
        Err(e) => log::warn!("{program} unavailable: {e}"),
    }
}

fn write_sysfs(path: &str, value: &str) {
    if let Err(e) = std::fs::write(path, value) {
        log::warn!("Cannot write {path}: {e}");
    }
}
