use std::io::Write;

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;
use quill_core::requisition::{Requisition, StatusSpan};
use quill_core::status::Status;

use super::editor::LineEditor;
use crate::error::Result;

pub const PROMPT: &str = "» ";

/// Most predictions listed under the line.
pub const MAX_PREDICTIONS: usize = 8;

/// Everything drawn for one state of the line.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub spans: Vec<StatusSpan>,
    pub cursor: usize,
    /// Why the line is not valid, or an error from the last key.
    pub message: Option<String>,
    pub predictions: Vec<PredictionLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionLine {
    pub name: String,
    pub description: Option<String>,
    pub selected: bool,
}

impl Frame {
    pub fn new(editor: &LineEditor, requisition: &Requisition) -> Self {
        let predictions = editor.predictions(requisition);
        let selected = editor.selected(predictions.len());
        let predictions = predictions
            .into_iter()
            .enumerate()
            .take(MAX_PREDICTIONS)
            .map(|(i, prediction)| PredictionLine {
                name: prediction.name,
                description: prediction.description,
                selected: Some(i) == selected,
            })
            .collect();

        let message = editor.notice().map(str::to_string).or_else(|| {
            let text = requisition.text();
            (!text.trim().is_empty()).then(|| requisition.status_message()).flatten()
        });

        Self {
            spans: requisition.input_status_markup(editor.cursor()),
            cursor: editor.cursor(),
            message,
            predictions,
        }
    }

    /// Lines drawn under the input line.
    pub fn extra_lines(&self) -> usize {
        usize::from(self.message.is_some()) + self.predictions.len()
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Valid => Color::Reset,
        Status::Incomplete => Color::Yellow,
        Status::Error => Color::Red,
    }
}

/// Redraws the line in place, from the start of the row the caret is on,
/// and leaves the caret where the editor has it.
pub fn draw(out: &mut impl Write, frame: &Frame, width: u16) -> Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::FromCursorDown), Print(PROMPT))?;
    for span in &frame.spans {
        queue!(out, SetForegroundColor(status_color(span.status)), Print(&span.text))?;
    }
    queue!(out, SetForegroundColor(Color::Reset))?;

    let width = usize::from(width.max(1));
    if let Some(message) = &frame.message {
        queue!(
            out,
            Print("\r\n"),
            SetForegroundColor(Color::DarkGrey),
            Print(truncate(message, width)),
            SetForegroundColor(Color::Reset)
        )?;
    }
    for prediction in &frame.predictions {
        let line = match &prediction.description {
            Some(description) => format!("  {}  {description}", prediction.name),
            None => format!("  {}", prediction.name),
        };
        queue!(out, Print("\r\n"))?;
        if prediction.selected {
            queue!(out, SetAttribute(Attribute::Reverse))?;
        }
        queue!(out, Print(truncate(&line, width)), SetAttribute(Attribute::Reset))?;
    }

    let extra = frame.extra_lines();
    if extra > 0 {
        queue!(out, MoveUp(u16::try_from(extra).unwrap_or(u16::MAX)))?;
    }
    let column = PROMPT.chars().count() + frame.cursor;
    queue!(out, MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
    out.flush()?;
    Ok(())
}

/// Clears whatever [`draw`] left under the line and moves to a fresh row.
pub fn finish_line(out: &mut impl Write) -> Result<()> {
    queue!(out, Clear(ClearType::FromCursorDown), Print("\r\n"))?;
    out.flush()?;
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width.saturating_sub(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use crate::history::History;
    use crate::host::ShellHost;
    use crate::session::Session;

    fn session() -> Session {
        let host = ShellHost::new(std::env::temp_dir(), "/bin/sh", true, 10);
        Session::new(host, History::in_memory(Vec::new()), Vec::new()).unwrap()
    }

    fn typed(text: &str) -> (Session, LineEditor) {
        let mut session = session();
        let mut editor = LineEditor::new();
        for c in text.chars() {
            editor.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE), &mut session);
        }
        (session, editor)
    }

    #[test]
    fn test_frame_lists_predictions() {
        let (session, editor) = typed("he");
        let frame = Frame::new(&editor, session.requisition());
        assert_eq!(frame.cursor, 2);
        assert_eq!(frame.predictions.len(), 1);
        assert_eq!(frame.predictions[0].name, "help");
        assert!(frame.predictions[0].selected);
        assert_eq!(frame.spans[0].status, Status::Incomplete);
    }

    #[test]
    fn test_frame_shows_errors() {
        let (session, editor) = typed("nosuch");
        let frame = Frame::new(&editor, session.requisition());
        assert!(frame.predictions.is_empty());
        assert!(frame.message.is_some());
        assert_eq!(frame.spans[0].status, Status::Error);
        assert_eq!(frame.extra_lines(), 1);
    }

    #[test]
    fn test_empty_line_has_no_message() {
        let (session, editor) = typed("");
        let frame = Frame::new(&editor, session.requisition());
        assert!(frame.message.is_none());
        assert!(frame.spans.is_empty());
    }

    #[test]
    fn test_draw_writes_prompt_and_line() {
        let (session, editor) = typed("help");
        let frame = Frame::new(&editor, session.requisition());
        let mut out = Vec::new();
        draw(&mut out, &frame, 80).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(PROMPT));
        assert!(text.contains("help"));
    }
}
