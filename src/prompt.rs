//! Interactive decisions.
//!
//! The pipeline only ever sees [`Decision`] values; raw answer strings stop
//! here.

use std::io::{BufRead, Write};

const YES_TOKENS: [&str; 6] = ["y", "Y", "Yes", "YES", "yes", "True"];
const NO_TOKENS: [&str; 6] = ["n", "N", "No", "NO", "no", "False"];

/// A yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    /// Maps a recognized answer token to a decision. Anything else is
    /// ambiguous and yields `None`; no default is applied.
    ///
    /// Surrounding whitespace is ignored, so `" yes "` is a yes. Case is not:
    /// only the listed spellings are accepted.
    pub fn parse(token: &str) -> Option<Decision> {
        let token = token.trim();
        if YES_TOKENS.contains(&token) {
            Some(Decision::Yes)
        } else if NO_TOKENS.contains(&token) {
            Some(Decision::No)
        } else {
            None
        }
    }

    pub fn is_yes(self) -> bool {
        self == Decision::Yes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Input closed or interrupted before a valid answer was given.
    #[error("input cancelled")]
    Cancelled,
    /// The retry budget ran out on invalid answers.
    #[error("no valid answer after {0} attempts")]
    RetriesExhausted(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Source of yes/no confirmations.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<Decision, PromptError>;
}

/// Answers every question with the same decision (scripted runs).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub Decision);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, question: &str) -> Result<Decision, PromptError> {
        tracing::info!("{} -> {:?} (non-interactive)", question.trim(), self.0);
        Ok(self.0)
    }
}

/// Line-oriented prompter over any reader/writer pair.
pub struct TerminalPrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    /// `None` re-prompts forever.
    max_retries: Option<usize>,
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio(max_retries: Option<usize>) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), max_retries)
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W, max_retries: Option<usize>) -> Self {
        Self {
            input,
            output,
            max_retries,
        }
    }

    fn read_answer(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(PromptError::Cancelled),
            Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Err(PromptError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }

    /// Asks for free text until `accept` returns true.
    pub fn ask_text(
        &mut self,
        question: &str,
        accept: impl Fn(&str) -> bool,
    ) -> Result<String, PromptError> {
        let mut attempts = 0;
        loop {
            let answer = self.read_answer(question)?;
            if accept(&answer) {
                return Ok(answer);
            }
            attempts += 1;
            if self.max_retries.is_some_and(|max| attempts >= max) {
                return Err(PromptError::RetriesExhausted(attempts));
            }
        }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompter<R, W> {
    fn confirm(&mut self, question: &str) -> Result<Decision, PromptError> {
        let mut attempts = 0;
        loop {
            let answer = self.read_answer(question)?;
            if let Some(decision) = Decision::parse(&answer) {
                return Ok(decision);
            }
            writeln!(self.output, "Invalid input. Please answer Yes or No")?;
            attempts += 1;
            if self.max_retries.is_some_and(|max| attempts >= max) {
                return Err(PromptError::RetriesExhausted(attempts));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str, retries: Option<usize>) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), retries)
    }

    #[test]
    fn test_decision_tokens() {
        for t in ["y", "Y", "Yes", "YES", "yes", "True"] {
            assert_eq!(Decision::parse(t), Some(Decision::Yes), "{}", t);
        }
        for t in ["n", "N", "No", "NO", "no", "False"] {
            assert_eq!(Decision::parse(t), Some(Decision::No), "{}", t);
        }
        assert_eq!(Decision::parse("yep"), None);
        assert_eq!(Decision::parse(""), None);
        assert_eq!(Decision::parse("true"), None);
        assert_eq!(Decision::parse(" yes \t"), Some(Decision::Yes));
        assert_eq!(Decision::parse("\tNo"), Some(Decision::No));
        assert_eq!(Decision::parse("y es"), None);
    }

    #[test]
    fn test_reprompts_until_valid() {
        let mut p = prompter("maybe\n\nno\n", None);
        assert_eq!(p.confirm("Continue? ").unwrap(), Decision::No);
        let shown = String::from_utf8(p.output.clone()).unwrap();
        assert_eq!(shown.matches("Continue? ").count(), 3);
        assert_eq!(shown.matches("Invalid input").count(), 2);
    }

    #[test]
    fn test_eof_is_cancelled() {
        let mut p = prompter("what\n", None);
        assert!(matches!(p.confirm("Continue? "), Err(PromptError::Cancelled)));
    }

    #[test]
    fn test_bounded_retries() {
        let mut p = prompter("a\nb\nc\nyes\n", Some(2));
        assert!(matches!(p.confirm("?"), Err(PromptError::RetriesExhausted(2))));
    }

    #[test]
    fn test_ask_text_validates() {
        let mut p = prompter("bad$name\ngood name\n", None);
        let answer = p.ask_text("File: ", |s| !s.contains('$')).unwrap();
        assert_eq!(answer, "good name");
    }

    #[test]
    fn test_auto_confirm() {
        assert_eq!(AutoConfirm(Decision::Yes).confirm("x").unwrap(), Decision::Yes);
    }
}
