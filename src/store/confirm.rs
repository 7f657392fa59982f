use std::io::{self, BufRead, Write};

/// Blocking yes/no step required before destructive bulk operations.
pub trait ConfirmationGate {
    fn confirm(&mut self, message: &str) -> bool;
}

/// The caller already obtained consent (e.g. `--yes`, or a TUI dialog).
#[derive(Debug, Clone, Copy, Default)]
pub struct Preconfirmed;

impl ConfirmationGate for Preconfirmed {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Declined;

impl ConfirmationGate for Declined {
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }
}

/// Asks on stdout and reads the answer from stdin. Anything other than
/// `y`/`yes` declines, and so does a non-interactive stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl ConfirmationGate for TerminalPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            tracing::warn!("stdin is not a terminal, declining confirmation");
            return false;
        }
        let mut stdout = io::stdout();
        if write!(stdout, "{message} [y/N]: ")
            .and_then(|_| stdout.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(err) => {
                tracing::warn!(?err, "failed to read confirmation");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_counts() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("yep"));
    }
}
