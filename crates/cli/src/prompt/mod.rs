//! The interactive prompt.
//!
//! Every key re-parses the line, so the input is coloured by status as it
//! is typed and the predictions for the argument under the caret are listed
//! beneath it.
//!
//! # Keys
//!
//! - Tab completes with the highlighted prediction, Shift-Tab picks the
//!   previous one
//! - Up and Down cycle the predictions, or walk the history on an empty line
//! - Page Up and Page Down step the value under the caret
//! - Enter runs a valid line
//! - Ctrl-C, or Ctrl-D on an empty line, quits

pub mod editor;
pub mod render;

use std::io::{stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use crossterm::{execute, queue};
use log::info;
use quill_core::output::{Output, OutputRecord};

pub use editor::{EditorAction, LineEditor};
use render::Frame;

use crate::error::Result;
use crate::session::{describe_output, Session};

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Results of background commands, waiting to be printed above the prompt.
#[derive(Clone, Default)]
struct Notices(Arc<Mutex<Vec<String>>>);

impl Notices {
    fn push(&self, text: String) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(text);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

enum LineResult {
    Execute,
    Quit,
}

/// Reads and runs lines until the user quits or runs `exit`.
///
/// # Errors
///
/// Returns an error if the terminal cannot be driven.
pub fn run(session: &mut Session) -> Result<()> {
    let notices = Notices::default();
    let mut editor = LineEditor::new();

    while !session.should_exit() {
        match read_line(session, &mut editor, &notices)? {
            LineResult::Quit => break,
            LineResult::Execute => {
                let output = session.execute(None);
                report(&output, &notices);
                editor.reset(session.requisition());
            }
        }
    }
    info!("Leaving the prompt");
    Ok(())
}

fn read_line(
    session: &mut Session,
    editor: &mut LineEditor,
    notices: &Notices,
) -> Result<LineResult> {
    let mut stdout = stdout();
    let _raw_mode_guard = RawModeGuard::enter()?;
    let (mut width, _) = terminal::size()?;
    let mut dirty = true;

    loop {
        let pending = notices.take();
        if !pending.is_empty() {
            print_above(&mut stdout, &pending)?;
            dirty = true;
        }
        if dirty {
            render::draw(&mut stdout, &Frame::new(editor, session.requisition()), width)?;
            dirty = false;
        }

        if !event::poll(Duration::from_millis(500))? {
            continue;
        }
        match event::read()? {
            Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                match editor.handle_key(key_event, session) {
                    EditorAction::Redraw => dirty = true,
                    EditorAction::Bell => {
                        execute!(stdout, Print("\x07"))?;
                        dirty = true;
                    }
                    EditorAction::Execute => {
                        render::finish_line(&mut stdout)?;
                        return Ok(LineResult::Execute);
                    }
                    EditorAction::Quit => {
                        render::finish_line(&mut stdout)?;
                        return Ok(LineResult::Quit);
                    }
                }
            }
            Event::Resize(new_width, _) => {
                width = new_width;
                dirty = true;
            }
            Event::Paste(text) => {
                for c in text.chars().filter(|c| !c.is_control()) {
                    editor.handle_key(event::KeyEvent::from(event::KeyCode::Char(c)), session);
                }
                dirty = true;
            }
            _ => {}
        }
    }
}

fn print_above(out: &mut impl Write, lines: &[String]) -> Result<()> {
    queue!(
        out,
        crossterm::cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::FromCursorDown)
    )?;
    for line in lines {
        for part in line.lines() {
            queue!(out, Print(part), Print("\r\n"))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Prints a finished result now, or once a background command settles.
fn report(output: &Output, notices: &Notices) {
    if output.is_completed() {
        if let Some(text) = describe_output(&output.record()) {
            println!("{text}");
        }
        return;
    }

    println!("Running `{}` in the background", output.record().typed);
    let reported = Arc::new(AtomicBool::new(false));
    let notify = {
        let notices = notices.clone();
        move |record: &OutputRecord| {
            if reported.swap(true, Ordering::SeqCst) {
                return;
            }
            let text = describe_output(record).unwrap_or_else(|| "Done".to_string());
            notices.push(format!("[{}] {text}", record.typed));
        }
    };
    output.on_close().subscribe(notify.clone());
    if output.is_completed() {
        notify(&output.record());
    }
}
