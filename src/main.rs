mod battery;
mod catalog;
mod cli;
mod config;
mod enumerate;
mod jobs;
mod menu;
mod metronome;
mod midi;
mod panel;
mod player;
mod power;
mod publisher;
mod recorder;
mod remote;
mod router;
mod soundfont;
mod state;
mod store;
mod synth;

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::battery::BatteryGauge;
use crate::catalog::PresetCatalog;
use crate::cli::{Cli, Command, EnumerateTarget};
use crate::config::{Config, Library};
use crate::jobs::Job;
use crate::menu::{Effect, MenuCtx};
use crate::metronome::MetroSettings;
use crate::midi::MidiManager;
use crate::player::Player;
use crate::publisher::Publisher;
use crate::recorder::Recorder;
use crate::remote::RemoteIntake;
use crate::state::{DeviceState, Event, JobDone};
use crate::synth::SynthCmd;

/// Minimum snapshot cadence even when nothing changed.
const PUBLISH_CADENCE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Enumerate(target)) => {
            env_logger::init();
            match target {
                EnumerateTarget::Midi => enumerate::midi(),
                EnumerateTarget::Outputs => enumerate::outputs(),
            }
        }
        None => run(cli),
    }
}

/// Custom logger that writes to stderr with \r\n line endings for raw mode.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400;
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

fn run(cli: Cli) -> anyhow::Result<()> {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.base_dir {
        config.base_dir = dir;
    }
    if let Some(dir) = cli.soundfont_dir {
        config.soundfont_dir = dir;
    }
    if let Some(dir) = cli.midi_dir {
        config.midi_dir = dir;
    }
    if let Some(port) = cli.synth_port {
        config.synth_port = port;
    }
    config.ensure_dirs()?;

    // The merged event stream: panel thread, MIDI input callback and the job
    // worker all feed this one channel. Remote markers are polled on this
    // thread between receives.
    let (event_tx, event_rx) = crossbeam_channel::bounded::<Event>(256);

    let (synth_tx, synth_handle) = synth::spawn(&config.synth_port);
    let (jobs_tx, _jobs_handle) =
        jobs::spawn(event_tx.clone(), Player::new(&config.synth_port));
    let (metro_tx, metro_rx) = crossbeam_channel::bounded::<MetroSettings>(16);
    let _metro_handle = metronome::spawn(synth_tx.clone(), metro_rx);

    let panel_enabled = !cli.no_panel;
    if panel_enabled {
        crossterm::terminal::enable_raw_mode()?;
        panel::spawn(event_tx.clone());
        log::info!("Panel: arrows navigate, Enter selects, Backspace goes back, Ctrl+Q quits");
    }

    let mut app = App {
        st: DeviceState::new(),
        catalog: PresetCatalog::default(),
        bank_loaded: false,
        recorder: Recorder::new(),
        lib: config.library(),
        publisher: Publisher::new(config.state_path()),
        remote: RemoteIntake::new(config.base_dir.clone()),
        battery: Box::new(battery::NoGauge),
        synth: synth_tx.clone(),
        jobs: jobs_tx,
        metro: metro_tx,
        midi: MidiManager::new(event_tx.clone()),
        mixer_path: config.mixer_path(),
        last_metro: MetroSettings { on: false, bpm: 120 },
        dirty: false,
        last_publish: Instant::now(),
    };

    app.st.channel_volumes = store::load_mixer(&app.mixer_path);
    app.send_synth(SynthCmd::Gain(app.st.master_volume));
    app.send_synth(SynthCmd::Cc {
        channel: metronome::CLICK_CHANNEL,
        controller: 7,
        value: app.st.metronome_click_volume,
    });
    app.publish();

    log::info!("Running. State file: {}", config.state_path().display());

    loop {
        let stop = match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => app.handle(event),
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        };
        if stop {
            break;
        }

        let mut stop = false;
        for control in app.remote.poll() {
            if app.handle(Event::Control(control)) {
                stop = true;
                break;
            }
        }
        if stop {
            break;
        }

        app.sync_metronome();
        app.maybe_publish();
    }

    if panel_enabled {
        crossterm::terminal::disable_raw_mode().ok();
    }

    drop(app);
    drop(synth_tx);
    synth_handle.join().ok();

    Ok(())
}

/// The serializing actor: sole owner of the device state. Every mutation
/// happens here, in event arrival order, and is followed by a snapshot flush.
struct App {
    st: DeviceState,
    catalog: PresetCatalog,
    bank_loaded: bool,
    recorder: Recorder,
    lib: Library,
    publisher: Publisher,
    remote: RemoteIntake,
    battery: Box<dyn BatteryGauge>,
    synth: Sender<SynthCmd>,
    jobs: Sender<Job>,
    metro: Sender<MetroSettings>,
    midi: MidiManager,
    mixer_path: PathBuf,
    last_metro: MetroSettings,
    dirty: bool,
    last_publish: Instant,
}

impl App {
    /// Process one event. Returns true when the appliance should stop.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Control(control) => {
                let ctx = MenuCtx { lib: &self.lib, bank_loaded: self.bank_loaded };
                let effects = menu::apply(&mut self.st, control, &ctx);
                self.dirty = true;
                for effect in effects {
                    if self.run_effect(effect) {
                        return true;
                    }
                }
                false
            }
            Event::Midi(raw) => {
                // Record first; routing never filters what gets captured
                self.recorder.add_event(raw);
                let routed = router::route(&mut self.st, raw, &self.catalog, self.bank_loaded);
                for cmd in routed.commands {
                    self.send_synth(cmd);
                }
                if routed.publish {
                    self.dirty = true;
                }
                false
            }
            Event::Job(done) => {
                self.handle_job(done);
                false
            }
            Event::Quit => true,
        }
    }

    fn run_effect(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Synth(cmd) => self.send_synth(cmd),
            Effect::LoadFont(path) => self.send_job(Job::LoadFont(path)),
            Effect::Play(path) => {
                self.silence_all();
                self.send_job(Job::Play(path));
            }
            Effect::StopPlayback => {
                self.send_job(Job::StopPlayback);
                self.silence_all();
                self.reassign_presets();
            }
            Effect::Delete(path) => self.send_job(Job::Delete(path)),
            Effect::ToggleRecord => self.toggle_record(),
            Effect::SetPowerProfile(low_power) => {
                power::apply_profile(low_power);
                self.send_synth(SynthCmd::Polyphony(if low_power { 48 } else { 96 }));
            }
            Effect::Shutdown => {
                self.shutdown();
                return true;
            }
            Effect::SaveMixer => {
                if let Err(e) = store::save_mixer(&self.mixer_path, &self.st.channel_volumes) {
                    log::warn!("Mixer save failed: {e:#}");
                    self.st.set_toast("Save Error");
                }
            }
            Effect::OpenMidiPort(name) => self.midi.open_port_by_name_async(name),
            Effect::ScanMidiPorts => {
                self.st.entries = self.midi.list_ports();
                self.st.paths.clear();
            }
        }
        false
    }

    fn handle_job(&mut self, done: JobDone) {
        self.dirty = true;
        match done {
            JobDone::FontLoaded { path, catalog } => {
                match catalog {
                    Some(catalog) => {
                        log::info!("Loaded soundfont: {}", path.display());
                        self.catalog = catalog;
                        self.st.set_toast("SF2 LOADED");
                    }
                    None => {
                        // Unreadable bank: keep going with placeholder presets
                        log::warn!("Soundfont {} yielded no catalog", path.display());
                        self.catalog = PresetCatalog::default();
                        self.st.set_toast("SF2 Error");
                    }
                }
                self.bank_loaded = true;
                self.reassign_presets();
                self.st.enter_main_menu();
            }
            JobDone::Deleted { path, error } => {
                match error {
                    None => {
                        log::info!("Deleted {}", path.display());
                        self.st.set_toast("Deleted");
                    }
                    Some(e) => {
                        log::warn!("Delete {} failed: {e}", path.display());
                        self.st.set_toast("Delete Error");
                    }
                }
                let ctx = MenuCtx { lib: &self.lib, bank_loaded: self.bank_loaded };
                menu::enter_midi_browse(&mut self.st, &ctx);
            }
            JobDone::PlayFailed => self.st.set_toast("Play Error"),
            JobDone::MidiConnected(name) => {
                log::info!("MIDI input connected: {name}");
                self.st.set_toast("MIDI Connected");
            }
        }
    }

    fn toggle_record(&mut self) {
        if !self.recorder.is_armed() {
            self.recorder.start();
            self.st.set_toast("Recording...");
            return;
        }
        let stamp = chrono::Local::now().format("%H%M%S");
        let path = self.lib.midi_target(&format!("rec_{stamp}"));
        match self.recorder.stop(Some(&path)) {
            Ok(()) => {
                log::info!("Recording saved to {}", path.display());
                self.st.set_toast("Saved Rec");
            }
            Err(e) => {
                log::warn!("Recording save failed: {e:#}");
                self.st.set_toast("Rec Error");
            }
        }
    }

    /// Terminal sequence: halt message out, synth torn down, OS power-off.
    /// No further events are processed.
    fn shutdown(&mut self) {
        log::info!("Shutdown requested");
        self.st.set_toast("SYSTEM HALT");
        self.publish();
        let _ = self.recorder.stop(None);
        self.send_synth(SynthCmd::Shutdown);
        std::thread::sleep(Duration::from_secs(1));
        power::halt();
    }

    fn silence_all(&mut self) {
        for channel in 0..16 {
            self.send_synth(SynthCmd::AllSoundsOff { channel });
        }
    }

    fn reassign_presets(&mut self) {
        let commands = router::assign_presets(&mut self.st, &self.catalog);
        for cmd in commands {
            self.send_synth(cmd);
        }
    }

    fn send_synth(&self, cmd: SynthCmd) {
        if self.synth.send(cmd).is_err() {
            log::warn!("Synth sink gone");
        }
    }

    fn send_job(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            log::warn!("Job worker gone");
        }
    }

    fn sync_metronome(&mut self) {
        let settings = MetroSettings { on: self.st.metronome_on, bpm: self.st.tempo_bpm };
        if settings != self.last_metro {
            self.last_metro = settings;
            if self.metro.send(settings).is_err() {
                log::warn!("Metronome gone");
            }
        }
    }

    fn maybe_publish(&mut self) {
        if self.dirty || self.last_publish.elapsed() >= PUBLISH_CADENCE {
            self.publish();
        }
    }

    fn publish(&mut self) {
        let battery = self.battery.time_left(self.st.low_power_mode);
        let snapshot = publisher::snapshot(&self.st, battery);
        if let Err(e) = self.publisher.publish(&snapshot) {
            log::warn!("State publish failed: {e:#}");
        }
        self.dirty = false;
        self.last_publish = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Mode;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let (event_tx, _event_rx) = crossbeam_channel::unbounded();
        let (synth_tx, _synth_rx) = crossbeam_channel::unbounded();
        let (jobs_tx, _jobs_rx) = crossbeam_channel::unbounded::<Job>();
        let (metro_tx, _metro_rx) = crossbeam_channel::unbounded();
        App {
            st: DeviceState::new(),
            catalog: PresetCatalog::default(),
            bank_loaded: false,
            recorder: Recorder::new(),
            lib: Library {
                soundfont_dir: dir.path().join("sf2"),
                midi_dir: dir.path().join("mid"),
            },
            publisher: Publisher::new(dir.path().join("monkey_state.json")),
            remote: RemoteIntake::new(dir.path().to_path_buf()),
            battery: Box::new(battery::NoGauge),
            synth: synth_tx,
            jobs: jobs_tx,
            metro: metro_tx,
            midi: MidiManager::new(event_tx),
            mixer_path: dir.path().join("mixer_settings.json"),
            last_metro: MetroSettings { on: false, bpm: 120 },
            dirty: false,
            last_publish: Instant::now(),
        }
    }

    #[test]
    fn successful_font_load_toasts_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        let mut catalog = PresetCatalog::default();
        catalog.insert(0, 0, "Piano");

        app.handle_job(JobDone::FontLoaded {
            path: dir.path().join("piano.sf2"),
            catalog: Some(catalog),
        });
        assert_eq!(app.st.toast(), "SF2 LOADED");
        assert!(app.bank_loaded);
        assert_eq!(app.st.mode, Mode::MainMenu);
    }

    #[test]
    fn failed_font_load_toasts_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        app.handle_job(JobDone::FontLoaded {
            path: dir.path().join("broken.sf2"),
            catalog: None,
        });
        assert_eq!(app.st.toast(), "SF2 Error");
        // The bank itself loaded; only the catalog degraded
        assert!(app.bank_loaded);
        assert_eq!(
            app.st.channel_presets.get(&0).map(String::as_str),
            Some("Generic Patch")
        );
        assert_eq!(app.st.mode, Mode::MainMenu);
    }
}
