use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};

use crate::state::{ControlEvent, Event};

/// Terminal stand-in for the four front-panel buttons.
///
/// Arrow keys map to UP/DOWN, Enter to SELECT, Backspace (or Esc) to BACK.
/// Ctrl+C / Ctrl+Q quit. On the appliance this module is replaced by a GPIO
/// edge listener feeding the same channel.
pub fn spawn(tx: Sender<Event>) -> JoinHandle<()> {
    std::thread::spawn(move || run(tx))
}

fn run(tx: Sender<Event>) {
    loop {
        match crossterm::event::poll(Duration::from_millis(100)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                log::warn!("Panel input error: {e}");
                return;
            }
        }
        let Ok(TermEvent::Key(key)) = crossterm::event::read() else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            let _ = tx.send(Event::Quit);
            return;
        }
        let event = match key.code {
            KeyCode::Up => ControlEvent::Up,
            KeyCode::Down => ControlEvent::Down,
            KeyCode::Enter => ControlEvent::Select,
            KeyCode::Backspace | KeyCode::Esc => ControlEvent::Back,
            _ => continue,
        };
        if tx.send(Event::Control(event)).is_err() {
            return;
        }
    }
}
