//! Compose-box state machine: the text buffer, the caret, and the mention
//! dropdown, with the submit-interception rules between them.

use crate::mention::{accept, Direction, MentionCatalog, MentionState};

/// Key presses a front-end forwards to the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

/// What the caller should do after a key was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing beyond re-rendering.
    Continue,
    /// Send the returned text to the open chat.
    Submit(String),
}

#[derive(Debug, Default)]
pub struct Composer {
    text: String,
    caret: usize,
    mention: MentionState,
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn mention(&self) -> &MentionState {
        &self.mention
    }

    /// Candidates for the current query, for rendering the dropdown.
    pub fn suggestions<'a>(&self, catalog: &'a MentionCatalog) -> Vec<&'a str> {
        if self.mention.is_open() {
            catalog.filtered(self.mention.query())
        } else {
            Vec::new()
        }
    }

    /// Route one key press. While the mention dropdown is open, Enter/Tab
    /// accept the highlighted candidate and Up/Down move the highlight;
    /// Enter submits only when the dropdown is closed.
    pub fn handle_key(&mut self, key: Key, catalog: &MentionCatalog) -> Outcome {
        match key {
            Key::Char(c) => self.insert(c),
            Key::Backspace => self.backspace(),
            Key::Left => self.move_left(),
            Key::Right => self.move_right(),
            Key::Up if self.mention.is_open() => {
                let count = self.suggestions(catalog).len();
                self.mention.navigate(Direction::Up, count);
            }
            Key::Down if self.mention.is_open() => {
                let count = self.suggestions(catalog).len();
                self.mention.navigate(Direction::Down, count);
            }
            Key::Tab if self.mention.is_open() => self.accept_highlighted(catalog),
            Key::Up | Key::Down | Key::Tab => {}
            Key::Escape => self.mention.dismiss(),
            Key::Enter => return self.enter(catalog),
        }
        Outcome::Continue
    }

    fn enter(&mut self, catalog: &MentionCatalog) -> Outcome {
        if self.mention.is_open() {
            self.accept_highlighted(catalog);
            return Outcome::Continue;
        }
        if self.text.trim().is_empty() {
            return Outcome::Continue;
        }
        let text = std::mem::take(&mut self.text);
        self.caret = 0;
        self.mention.dismiss();
        Outcome::Submit(text)
    }

    fn accept_highlighted(&mut self, catalog: &MentionCatalog) {
        let suggestions = catalog.filtered(self.mention.query());
        // Open with nothing to accept: swallow the key, keep the state.
        if suggestions.is_empty() {
            return;
        }
        let candidate = suggestions[self.mention.highlighted().min(suggestions.len() - 1)];
        if let Some((text, caret)) = accept(&self.text, self.caret, candidate) {
            self.text = text;
            self.caret = caret;
        }
        self.mention.dismiss();
    }

    fn insert(&mut self, c: char) {
        self.text.insert(self.caret, c);
        self.caret += c.len_utf8();
        self.refresh_mention();
    }

    fn backspace(&mut self) {
        if let Some(previous) = self.previous_boundary() {
            self.text.remove(previous);
            self.caret = previous;
        }
        self.refresh_mention();
    }

    fn move_left(&mut self) {
        if let Some(previous) = self.previous_boundary() {
            self.caret = previous;
        }
        self.refresh_mention();
    }

    fn move_right(&mut self) {
        if let Some(c) = self.text[self.caret..].chars().next() {
            self.caret += c.len_utf8();
        }
        self.refresh_mention();
    }

    fn previous_boundary(&self) -> Option<usize> {
        self.text[..self.caret].char_indices().last().map(|(i, _)| i)
    }

    fn refresh_mention(&mut self) {
        self.mention.update(&self.text, self.caret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::User;

    fn catalog_of(names: &[&str]) -> MentionCatalog {
        let members: Vec<User> = names
            .iter()
            .enumerate()
            .map(|(i, name)| User {
                id: i64::try_from(i).unwrap(),
                email: format!("{name}@example.com"),
                username: (*name).to_string(),
            })
            .collect();
        MentionCatalog::new(&members, "me")
    }

    fn type_text(composer: &mut Composer, catalog: &MentionCatalog, text: &str) {
        for c in text.chars() {
            composer.handle_key(Key::Char(c), catalog);
        }
    }

    #[test]
    fn typing_an_at_token_opens_the_dropdown() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "hi @al");
        assert!(composer.mention().is_open());
        assert_eq!(composer.mention().query(), "al");
        assert_eq!(composer.suggestions(&catalog), vec!["alice"]);
    }

    #[test]
    fn enter_accepts_instead_of_submitting_while_open() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "hi @al");
        let outcome = composer.handle_key(Key::Enter, &catalog);
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(composer.text(), "hi @alice ");
        assert_eq!(composer.caret(), "hi @alice ".len());
        assert!(!composer.mention().is_open());
    }

    #[test]
    fn second_enter_submits_and_clears() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "hi @al");
        composer.handle_key(Key::Enter, &catalog);
        let outcome = composer.handle_key(Key::Enter, &catalog);
        assert_eq!(outcome, Outcome::Submit("hi @alice ".to_string()));
        assert_eq!(composer.text(), "");
        assert_eq!(composer.caret(), 0);
    }

    #[test]
    fn tab_accepts_the_highlighted_candidate() {
        let catalog = catalog_of(&["alice", "albert"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "@al");
        composer.handle_key(Key::Down, &catalog);
        composer.handle_key(Key::Tab, &catalog);
        assert_eq!(composer.text(), "@albert ");
    }

    #[test]
    fn enter_with_no_candidates_does_nothing() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "hey @zzz");
        let outcome = composer.handle_key(Key::Enter, &catalog);
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(composer.text(), "hey @zzz");
        assert!(composer.mention().is_open());
    }

    #[test]
    fn escape_dismisses_then_enter_submits() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "hey @al");
        composer.handle_key(Key::Escape, &catalog);
        assert!(!composer.mention().is_open());
        let outcome = composer.handle_key(Key::Enter, &catalog);
        assert_eq!(outcome, Outcome::Submit("hey @al".to_string()));
    }

    #[test]
    fn blank_input_never_submits() {
        let catalog = catalog_of(&[]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "   ");
        assert_eq!(composer.handle_key(Key::Enter, &catalog), Outcome::Continue);
    }

    #[test]
    fn backspace_reopens_a_broken_mention() {
        let catalog = catalog_of(&["alice"]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "@al ");
        assert!(!composer.mention().is_open());
        composer.handle_key(Key::Backspace, &catalog);
        assert!(composer.mention().is_open());
        assert_eq!(composer.mention().query(), "al");
    }

    #[test]
    fn caret_moves_track_multibyte_characters() {
        let catalog = catalog_of(&[]);
        let mut composer = Composer::default();
        type_text(&mut composer, &catalog, "héllo");
        composer.handle_key(Key::Left, &catalog);
        composer.handle_key(Key::Left, &catalog);
        composer.handle_key(Key::Char('x'), &catalog);
        assert_eq!(composer.text(), "hélxlo");
    }
}
