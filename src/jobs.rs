use std::path::PathBuf;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::player::Player;
use crate::soundfont;
use crate::state::{Event, JobDone};

/// Long-running side effects that must not stall the actor.
#[derive(Debug)]
pub enum Job {
    LoadFont(PathBuf),
    Delete(PathBuf),
    Play(PathBuf),
    StopPlayback,
}

/// Start the worker thread. It owns the playback child process and reports
/// every completion back onto the actor channel.
pub fn spawn(event_tx: Sender<Event>, player: Player) -> (Sender<Job>, JoinHandle<()>) {
    let (tx, rx) = crossbeam_channel::bounded::<Job>(32);
    let handle = std::thread::spawn(move || run(rx, event_tx, player));
    (tx, handle)
}

fn run(rx: crossbeam_channel::Receiver<Job>, event_tx: Sender<Event>, mut player: Player) {
    for job in rx.iter() {
        let done = match job {
            Job::LoadFont(path) => {
                let catalog = match soundfont::load_catalog(&path) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        log::warn!("Soundfont load failed: {e:#}");
                        None
                    }
                };
                Some(JobDone::FontLoaded { path, catalog })
            }
            Job::Delete(path) => {
                let error = std::fs::remove_file(&path).err().map(|e| e.to_string());
                Some(JobDone::Deleted { path, error })
            }
            Job::Play(path) => match player.play(&path) {
                Ok(()) => None,
                Err(e) => {
                    log::warn!("Playback failed: {e:#}");
                    Some(JobDone::PlayFailed)
                }
            },
            Job::StopPlayback => {
                player.stop();
                None
            }
        };
        if let Some(done) = done {
            if event_tx.send(Event::Job(done)).is_err() {
                return;
            }
        }
    }
}
