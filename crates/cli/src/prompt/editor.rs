use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;
use quill_core::conversion::Prediction;
use quill_core::requisition::{Cursor, Requisition};
use quill_core::status::Status;

use crate::session::Session;

/// What the prompt loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Redraw,
    /// The key did nothing useful.
    Bell,
    Execute,
    Quit,
}

/// Caret, prediction choice and history position over a session's line.
/// The text itself lives in the requisition.
#[derive(Debug, Default)]
pub struct LineEditor {
    cursor: usize,
    choice: isize,
    /// How far back in the history the line came from, `0` for a typed line.
    history_back: usize,
    notice: Option<String>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caret position, in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// An error from the last key, shown until the next one.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Index into [`LineEditor::predictions`] that Tab would complete with.
    pub fn selected(&self, count: usize) -> Option<usize> {
        (count > 0).then(|| self.choice.rem_euclid(count as isize) as usize)
    }

    /// Predictions for the assignment under the caret.
    pub fn predictions(&self, requisition: &Requisition) -> Vec<Prediction> {
        requisition.assignment_at(self.cursor).predictions()
    }

    /// Puts the caret at the end of whatever the requisition now holds,
    /// for after it was changed from outside the editor.
    pub fn reset(&mut self, requisition: &Requisition) {
        self.cursor = requisition.text().chars().count();
        self.choice = 0;
        self.history_back = 0;
        self.notice = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent, session: &mut Session) -> EditorAction {
        self.notice = None;
        let control = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if control => EditorAction::Quit,
            KeyCode::Char('d') if control => {
                if session.requisition().text().is_empty() {
                    EditorAction::Quit
                } else {
                    self.delete_at(session.requisition_mut(), self.cursor)
                }
            }
            KeyCode::Char('u') if control => {
                session.requisition_mut().update("");
                self.reset(session.requisition());
                EditorAction::Redraw
            }
            KeyCode::Char('a') if control => self.move_to(0),
            KeyCode::Char('e') if control => {
                self.move_to(session.requisition().text().chars().count())
            }
            KeyCode::Char(c) if !control => self.insert(session.requisition_mut(), c),
            KeyCode::Backspace if self.cursor > 0 => {
                self.delete_at(session.requisition_mut(), self.cursor - 1)
            }
            KeyCode::Delete => self.delete_at(session.requisition_mut(), self.cursor),
            KeyCode::Left if self.cursor > 0 => self.move_to(self.cursor - 1),
            KeyCode::Right => {
                let len = session.requisition().text().chars().count();
                if self.cursor < len {
                    self.move_to(self.cursor + 1)
                } else {
                    EditorAction::Bell
                }
            }
            KeyCode::Home => self.move_to(0),
            KeyCode::End => self.move_to(session.requisition().text().chars().count()),
            KeyCode::Tab => self.complete(session.requisition_mut()),
            KeyCode::BackTab => {
                self.choice -= 1;
                EditorAction::Redraw
            }
            KeyCode::Up => self.vertical(session, true),
            KeyCode::Down => self.vertical(session, false),
            KeyCode::PageUp => self.step(session.requisition_mut(), true),
            KeyCode::PageDown => self.step(session.requisition_mut(), false),
            KeyCode::Esc => {
                self.choice = 0;
                EditorAction::Redraw
            }
            KeyCode::Enter => {
                if session.requisition().status() == Status::Valid {
                    EditorAction::Execute
                } else {
                    EditorAction::Bell
                }
            }
            _ => EditorAction::Bell,
        }
    }

    fn move_to(&mut self, cursor: usize) -> EditorAction {
        self.cursor = cursor;
        self.choice = 0;
        EditorAction::Redraw
    }

    fn insert(&mut self, requisition: &mut Requisition, c: char) -> EditorAction {
        let mut text = requisition.text().to_string();
        text.insert(byte_index(&text, self.cursor), c);
        self.edited(requisition, &text, self.cursor + 1)
    }

    fn delete_at(&mut self, requisition: &mut Requisition, at: usize) -> EditorAction {
        let mut text = requisition.text().to_string();
        if at >= text.chars().count() {
            return EditorAction::Bell;
        }
        text.remove(byte_index(&text, at));
        self.edited(requisition, &text, at)
    }

    fn edited(&mut self, requisition: &mut Requisition, text: &str, cursor: usize) -> EditorAction {
        requisition.update(text);
        self.cursor = cursor;
        self.choice = 0;
        self.history_back = 0;
        EditorAction::Redraw
    }

    /// Completion keeps the caret the same distance from the end of the
    /// line, which leaves it after the completed text.
    fn complete(&mut self, requisition: &mut Requisition) -> EditorAction {
        let before = requisition.text().chars().count();
        let from_end = before.saturating_sub(self.cursor);
        if let Err(e) = requisition.complete(Cursor::at(self.cursor), self.choice) {
            self.notice = Some(e.to_string());
            return EditorAction::Bell;
        }

        let after = requisition.text().chars().count();
        if after == before {
            return EditorAction::Bell;
        }
        self.cursor = after.saturating_sub(from_end);
        self.choice = 0;
        EditorAction::Redraw
    }

    /// Up and Down walk the history on an empty or recalled line, and
    /// cycle the predictions otherwise.
    fn vertical(&mut self, session: &mut Session, up: bool) -> EditorAction {
        let browsing = self.history_back > 0 || session.requisition().text().is_empty();
        if !browsing {
            if self.predictions(session.requisition()).is_empty() {
                return EditorAction::Bell;
            }
            self.choice += if up { -1 } else { 1 };
            return EditorAction::Redraw;
        }

        let back = if up {
            self.history_back + 1
        } else {
            self.history_back.saturating_sub(1)
        };
        let line = if back == 0 {
            String::new()
        } else {
            match session.state().recall(back) {
                Some(line) => line,
                None => return EditorAction::Bell,
            }
        };
        debug!("Recalling history entry {back}");

        session.requisition_mut().update(&line);
        self.reset(session.requisition());
        self.history_back = back;
        EditorAction::Redraw
    }

    fn step(&mut self, requisition: &mut Requisition, up: bool) -> EditorAction {
        let assignment = requisition.assignment_at(self.cursor);
        if assignment.is_command() || assignment.is_unassigned() {
            return EditorAction::Bell;
        }

        let name = assignment.name().to_string();
        let from_end = requisition.text().chars().count().saturating_sub(self.cursor);
        let result = if up {
            requisition.increment(&name)
        } else {
            requisition.decrement(&name)
        };
        if let Err(e) = result {
            self.notice = Some(e.to_string());
            return EditorAction::Bell;
        }

        self.cursor = requisition.text().chars().count().saturating_sub(from_end);
        self.history_back = 0;
        EditorAction::Redraw
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::host::ShellHost;

    fn session() -> Session {
        let definitions = serde_yaml::from_str(
            r#"
- name: greet
  command: ["echo", "Hello", "{name}"]
  params:
    - name: name
- name: repeat
  command: ["echo", "{count}"]
  params:
    - name: count
      type: number
"#,
        )
        .unwrap();
        let host = ShellHost::new(std::env::temp_dir(), "/bin/sh", true, 10);
        let history =
            History::in_memory(vec!["greet barney".to_string(), "greet fred".to_string()]);
        Session::new(host, history, definitions).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut LineEditor, session: &mut Session, text: &str) {
        for c in text.chars() {
            assert_eq!(
                editor.handle_key(key(KeyCode::Char(c)), session),
                EditorAction::Redraw
            );
        }
    }

    #[test]
    fn test_typing_and_deleting() {
        let mut session = session();
        let mut editor = LineEditor::new();
        type_text(&mut editor, &mut session, "grt");
        editor.handle_key(key(KeyCode::Left), &mut session);
        type_text(&mut editor, &mut session, "ee");
        assert_eq!(session.requisition().text(), "greet");
        assert_eq!(editor.cursor(), 4);

        editor.handle_key(key(KeyCode::Backspace), &mut session);
        editor.handle_key(key(KeyCode::Delete), &mut session);
        assert_eq!(session.requisition().text(), "gre");
        assert_eq!(
            editor.handle_key(key(KeyCode::Delete), &mut session),
            EditorAction::Bell
        );
    }

    #[test]
    fn test_tab_completes_command() {
        let mut session = session();
        let mut editor = LineEditor::new();
        type_text(&mut editor, &mut session, "gre");
        assert_eq!(editor.predictions(session.requisition())[0].name, "greet");

        editor.handle_key(key(KeyCode::Tab), &mut session);
        assert_eq!(session.requisition().text(), "greet ");
        assert_eq!(editor.cursor(), 6);
    }

    #[test]
    fn test_enter_needs_a_valid_line() {
        let mut session = session();
        let mut editor = LineEditor::new();
        type_text(&mut editor, &mut session, "greet");
        assert_eq!(
            editor.handle_key(key(KeyCode::Enter), &mut session),
            EditorAction::Bell
        );

        type_text(&mut editor, &mut session, " fred");
        assert_eq!(
            editor.handle_key(key(KeyCode::Enter), &mut session),
            EditorAction::Execute
        );
    }

    #[test]
    fn test_history_browsing() {
        let mut session = session();
        let mut editor = LineEditor::new();
        editor.handle_key(key(KeyCode::Up), &mut session);
        assert_eq!(session.requisition().text(), "greet fred");
        editor.handle_key(key(KeyCode::Up), &mut session);
        assert_eq!(session.requisition().text(), "greet barney");
        assert_eq!(
            editor.handle_key(key(KeyCode::Up), &mut session),
            EditorAction::Bell
        );
        assert_eq!(editor.cursor(), 12);

        editor.handle_key(key(KeyCode::Down), &mut session);
        editor.handle_key(key(KeyCode::Down), &mut session);
        assert_eq!(session.requisition().text(), "");
    }

    #[test]
    fn test_page_keys_step_values() {
        let mut session = session();
        let mut editor = LineEditor::new();
        type_text(&mut editor, &mut session, "repeat 3");
        editor.handle_key(key(KeyCode::PageUp), &mut session);
        assert_eq!(session.requisition().text(), "repeat 4");
        editor.handle_key(key(KeyCode::PageDown), &mut session);
        editor.handle_key(key(KeyCode::PageDown), &mut session);
        assert_eq!(session.requisition().text(), "repeat 2");

        editor.handle_key(key(KeyCode::Home), &mut session);
        assert_eq!(
            editor.handle_key(key(KeyCode::PageUp), &mut session),
            EditorAction::Bell
        );
    }

    #[test]
    fn test_control_keys() {
        let mut session = session();
        let mut editor = LineEditor::new();
        type_text(&mut editor, &mut session, "greet");
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);

        editor.handle_key(ctrl('u'), &mut session);
        assert_eq!(session.requisition().text(), "");
        assert_eq!(editor.cursor(), 0);
        assert_eq!(
            editor.handle_key(ctrl('d'), &mut session),
            EditorAction::Quit
        );
        assert_eq!(
            editor.handle_key(ctrl('c'), &mut session),
            EditorAction::Quit
        );
    }
}
