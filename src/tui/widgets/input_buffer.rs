//! Single-line text input with a cursor, shared by the search box and the
//! book form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

/// Text plus a cursor measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `text`, cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let content = text.into();
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    /// Whitespace-only counts as empty.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn len_chars(&self) -> usize {
        self.content.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len_chars() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete the word before the cursor (Ctrl+W).
    pub fn delete_word(&mut self) {
        let chars: Vec<char> = self.content.chars().collect();
        let mut start = self.cursor;
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let (from, to) = (self.byte_index(start), self.byte_index(self.cursor));
        self.content.drain(from..to);
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len_chars());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len_chars();
    }

    /// Apply an editing key. Returns true if the text or cursor changed
    /// meaning; keys that are not editing keys are left to the caller.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('w')) => self.delete_word(),
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => self.clear(),
            (KeyModifiers::CONTROL, KeyCode::Char('a')) => self.move_home(),
            (KeyModifiers::CONTROL, KeyCode::Char('e')) => self.move_end(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => self.insert_char(c),
            (_, KeyCode::Backspace) => self.backspace(),
            (_, KeyCode::Delete) => self.delete(),
            (_, KeyCode::Left) => self.move_left(),
            (_, KeyCode::Right) => self.move_right(),
            (_, KeyCode::Home) => self.move_home(),
            (_, KeyCode::End) => self.move_end(),
            _ => return false,
        }
        true
    }

    /// Render as a line; with `focused`, the cursor cell is reversed.
    pub fn to_line(&self, style: Style, focused: bool) -> Line<'static> {
        if !focused {
            return Line::from(Span::styled(self.content.clone(), style));
        }
        let at = self.byte_index(self.cursor);
        let (before, rest) = self.content.split_at(at);
        let mut rest_chars = rest.chars();
        let under = rest_chars.next().map(String::from).unwrap_or_else(|| " ".to_string());
        Line::from(vec![
            Span::styled(before.to_string(), style),
            Span::styled(under, style.add_modifier(Modifier::REVERSED)),
            Span::styled(rest_chars.as_str().to_string(), style),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_cursor() {
        let mut buf = InputBuffer::new();
        for c in "dune".chars() {
            assert!(buf.handle_key(&key(KeyCode::Char(c))));
        }
        assert_eq!(buf.text(), "dune");
        assert_eq!(buf.cursor_position(), 4);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut buf = InputBuffer::with_text("Señor");
        buf.move_left();
        buf.move_left();
        buf.backspace();
        assert_eq!(buf.text(), "Seor");
        buf.insert_char('ñ');
        assert_eq!(buf.text(), "Señor");
        buf.move_home();
        buf.delete();
        assert_eq!(buf.text(), "eñor");
    }

    #[test]
    fn test_delete_word() {
        let mut buf = InputBuffer::with_text("The Left Hand  ");
        buf.delete_word();
        assert_eq!(buf.text(), "The Left ");
        assert_eq!(buf.cursor_position(), 9);
    }

    #[test]
    fn test_non_editing_keys_are_not_consumed() {
        let mut buf = InputBuffer::new();
        assert!(!buf.handle_key(&key(KeyCode::Enter)));
        assert!(!buf.handle_key(&key(KeyCode::Esc)));
        assert!(!buf.handle_key(&key(KeyCode::Tab)));
    }

    #[test]
    fn test_is_empty_trims() {
        let mut buf = InputBuffer::with_text("  ");
        assert!(buf.is_empty());
        buf.insert_char('a');
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_to_line_marks_cursor() {
        let buf = InputBuffer::with_text("ab");
        let line = buf.to_line(Style::default(), true);
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].content, "ab");
        assert_eq!(line.spans[1].content, " ");
        assert_eq!(buf.to_line(Style::default(), false).spans.len(), 1);
    }
}
