// Per-(entity, username) conversation cursors over linear or branching scripts.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueLine {
    Say(String),
    /// Multiple-choice prompt. Advancing past it requires `choose`.
    Choice(Vec<String>),
    /// Answers keyed by the option index picked at the preceding `Choice`.
    Branch(BTreeMap<usize, String>),
}

/// What a conversation step asks the client to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueMessage {
    Line(String),
    Choices(Vec<String>),
    End,
}

/// How a step changed the user's conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Opened,
    Advanced,
    Closed,
    Unchanged,
}

/// A script plus the cursor of everyone currently talking through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    script: Vec<DialogueLine>,
    cursors: HashMap<String, usize>,
}

impl Conversation {
    pub fn new(script: Vec<DialogueLine>) -> Self {
        Self {
            script,
            cursors: HashMap::new(),
        }
    }

    pub fn is_talking(&self, username: &str) -> bool {
        self.cursors.contains_key(username)
    }

    pub fn cursor(&self, username: &str) -> Option<usize> {
        self.cursors.get(username).copied()
    }

    pub fn active_count(&self) -> usize {
        self.cursors.len()
    }

    /// Opens a conversation or advances it by one line.
    pub fn interact(&mut self, username: &str, out: &mut Vec<DialogueMessage>) -> Progress {
        let Some(cursor) = self.cursor(username) else {
            if self.script.is_empty() {
                return Progress::Unchanged;
            }
            let cursor = self.show(0, out);
            self.cursors.insert(username.to_string(), cursor);
            return Progress::Opened;
        };

        if matches!(self.script.get(cursor), Some(DialogueLine::Choice(_))) {
            // Waiting on `choose`.
            return Progress::Unchanged;
        }

        let mut next = cursor + 1;
        while matches!(self.script.get(next), Some(DialogueLine::Branch(_))) {
            next += 1;
        }
        if next >= self.script.len() {
            return self.close(username, out);
        }
        let cursor = self.show(next, out);
        self.cursors.insert(username.to_string(), cursor);
        Progress::Advanced
    }

    /// Answers the pending multiple-choice prompt.
    pub fn choose(
        &mut self,
        username: &str,
        choice: usize,
        out: &mut Vec<DialogueMessage>,
    ) -> Progress {
        let Some(cursor) = self.cursor(username) else {
            return Progress::Unchanged;
        };
        let next = cursor + 1;
        if next >= self.script.len() {
            return self.close(username, out);
        }

        let Some(DialogueLine::Choice(options)) = self.script.get(cursor) else {
            return Progress::Unchanged;
        };
        if choice >= options.len() {
            return Progress::Unchanged;
        }

        match self.script.get(next) {
            Some(DialogueLine::Branch(answers)) => match answers.get(&choice) {
                Some(text) => {
                    out.push(DialogueMessage::Line(text.clone()));
                    self.cursors.insert(username.to_string(), next);
                    Progress::Advanced
                }
                // No answer for this option: stay on the prompt so the user can retry.
                None => Progress::Unchanged,
            },
            Some(_) => {
                let cursor = self.show(next, out);
                self.cursors.insert(username.to_string(), cursor);
                Progress::Advanced
            }
            None => self.close(username, out),
        }
    }

    fn close(&mut self, username: &str, out: &mut Vec<DialogueMessage>) -> Progress {
        self.cursors.remove(username);
        out.push(DialogueMessage::End);
        Progress::Closed
    }

    /// Emits the line at `index`, returning where the cursor should rest.
    ///
    /// A `Say` directly followed by a `Choice` also presents the choice.
    fn show(&self, index: usize, out: &mut Vec<DialogueMessage>) -> usize {
        match self.script.get(index) {
            Some(DialogueLine::Say(text)) => {
                out.push(DialogueMessage::Line(text.clone()));
                if let Some(DialogueLine::Choice(options)) = self.script.get(index + 1) {
                    out.push(DialogueMessage::Choices(options.clone()));
                    return index + 1;
                }
                index
            }
            Some(DialogueLine::Choice(options)) => {
                out.push(DialogueMessage::Choices(options.clone()));
                index
            }
            Some(DialogueLine::Branch(_)) | None => index,
        }
    }
}
