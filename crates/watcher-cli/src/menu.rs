//! Interactive capture-interval chooser.
//!
//! Arrow keys (or `k`/`j`) move the cursor, Enter confirms, and Ctrl-C,
//! Esc or `q` cancel. The terminal is left in raw mode only while the menu
//! is on screen.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use watcher_common::constants::CAPTURE_INTERVALS;

/// Outcome of a single key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// The option at this index was confirmed.
    Choose(usize),
    /// The user asked to quit.
    Cancel,
}

/// Cursor state over a fixed list of options.
#[derive(Debug)]
pub struct Menu {
    selected: usize,
    len: usize,
}

impl Menu {
    /// Creates a menu over `len` options with the first one selected.
    pub const fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Index of the highlighted option.
    pub const fn selected(&self) -> usize {
        self.selected
    }

    /// Applies a key press, returning an action once the user decides.
    pub fn handle(&mut self, key: KeyEvent) -> Option<MenuAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(MenuAction::Cancel)
            }
            KeyCode::Esc | KeyCode::Char('q') => Some(MenuAction::Cancel),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.len {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Enter => Some(MenuAction::Choose(self.selected)),
            _ => None,
        }
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Shows the interval menu and waits for a choice.
///
/// Returns `None` if the user cancelled.
///
/// # Errors
///
/// Returns an error if the terminal cannot be switched to raw mode or
/// read from.
pub fn choose_interval() -> io::Result<Option<Duration>> {
    let _raw = RawModeGuard::enable()?;
    let mut menu = Menu::new(CAPTURE_INTERVALS.len());
    let mut stdout = io::stdout();

    loop {
        render(&mut stdout, &menu)?;
        let Event::Key(key) = event::read()? else {
            continue;
        };
        match menu.handle(key) {
            Some(MenuAction::Choose(idx)) => {
                let interval = CAPTURE_INTERVALS.get(idx).map(|(_, every)| *every);
                tracing::debug!(?interval, "capture interval chosen");
                return Ok(interval);
            }
            Some(MenuAction::Cancel) => return Ok(None),
            None => {}
        }
    }
}

fn render(out: &mut impl Write, menu: &Menu) -> io::Result<()> {
    queue!(
        out,
        terminal::Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        Print("Please choose how often to capture open network connections:\r\n")
    )?;
    for (idx, (label, _)) in CAPTURE_INTERVALS.iter().enumerate() {
        let marker = if idx == menu.selected() { "→" } else { " " };
        queue!(out, Print(format!("{marker} {label}\r\n")))?;
    }
    out.flush()
}
