use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "monkeybox", about = "Menu-driven MIDI appliance control core")]
pub struct Cli {
    /// Config file (.toml) overriding the default directory layout
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base directory for state file, command markers and mixer store
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Soundfont (.sf2) directory
    #[arg(long)]
    pub soundfont_dir: Option<PathBuf>,

    /// MIDI file (.mid) directory
    #[arg(long)]
    pub midi_dir: Option<PathBuf>,

    /// Substring of the synth's MIDI output port name
    #[arg(long)]
    pub synth_port: Option<String>,

    /// Disable the terminal front panel (headless deployment)
    #[arg(long)]
    pub no_panel: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List available MIDI devices
    #[command(subcommand)]
    Enumerate(EnumerateTarget),
}

#[derive(Subcommand)]
pub enum EnumerateTarget {
    /// List available MIDI input devices
    Midi,
    /// List available MIDI output devices (synth candidates)
    Outputs,
}
