//! Bounded-wait confirmation prompts.
//!
//! Destructive operations ask for a typed "yes" and give up after a fixed
//! time. No answer counts as "no".

use anyhow::Result;
use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

/// Operator's response to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    TimedOut,
}

impl Answer {
    /// Interpret a typed line; only `y`/`yes` (any case) is affirmative
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => Answer::Yes,
            _ => Answer::No,
        }
    }

    pub fn is_yes(self) -> bool {
        self == Answer::Yes
    }
}

/// Source of confirmation answers
pub trait Confirmer {
    fn confirm(&self, prompt: &str, timeout: Duration) -> Result<Answer>;
}

/// Reads the answer from stdin, giving up after the timeout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str, timeout: Duration) -> Result<Answer> {
        anstream::eprint!("{} [y/N] ({}s): ", prompt, timeout.as_secs());

        let (tx, rx) = mpsc::channel();
        // The reader thread is left blocked on stdin after a timeout; the
        // process exits shortly after an abort anyway.
        std::thread::spawn(move || {
            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line);
            let _ = tx.send(read.map(|_| line));
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(Answer::parse(&line)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                anstream::eprintln!();
                Ok(Answer::TimedOut)
            }
        }
    }
}
