//! The operator at the terminal.
//!
//! Conflict pauses and review-request decisions are the only points where a
//! run waits on a person. Both go through [`Operator`] so the engine and the
//! review sync can be driven by scripted answers in tests.

use std::io::{self, BufRead, Write};

/// What to do with a branch whose review requests are all closed unmerged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactiveBranchChoice {
    /// The branch's changes landed some other way; record it as merged.
    MarkMerged,
    /// Open a fresh review request for the branch.
    OpenNew,
}

/// Prompts the operator.
pub trait Operator {
    /// Called after a merge into `branch` stopped on conflicts, and again while
    /// the tree is still unclean. `false` aborts the run.
    fn confirm_resume(&mut self, branch: &str, conflicts: &[String]) -> io::Result<bool>;

    /// Called for a non-merged branch with no open review request.
    fn resolve_inactive_branch(&mut self, branch: &str) -> io::Result<InactiveBranchChoice>;
}

/// Line-oriented prompts over any reader and writer.
#[derive(Debug)]
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr and reads answers from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed, lowercased line. End of input is an error so a
    /// closed stdin can never be mistaken for consent.
    fn read_answer(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_ascii_lowercase())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn confirm_resume(&mut self, branch: &str, conflicts: &[String]) -> io::Result<bool> {
        writeln!(self.output, "Merge into {} stopped with conflicts:", branch)?;
        for file in conflicts {
            writeln!(self.output, "    {}", file)?;
        }
        loop {
            write!(
                self.output,
                "Resolve and commit the merge, then continue? [y/n] "
            )?;
            self.output.flush()?;
            match self.read_answer()?.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    fn resolve_inactive_branch(&mut self, branch: &str) -> io::Result<InactiveBranchChoice> {
        writeln!(
            self.output,
            "Branch {} has no open pull request; its requests were all closed without merging.",
            branch
        )?;
        loop {
            write!(
                self.output,
                "(m)ark {} as merged, or (o)pen a new pull request? ",
                branch
            )?;
            self.output.flush()?;
            match self.read_answer()?.as_str() {
                "m" | "merged" => return Ok(InactiveBranchChoice::MarkMerged),
                "o" | "open" => return Ok(InactiveBranchChoice::OpenNew),
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn operator(input: &str) -> TerminalOperator<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn confirm_resume_repeats_until_a_clear_answer() {
        let mut op = operator("maybe\n\nY\n");
        assert!(op.confirm_resume("b3", &["src/lib.rs".into()]).unwrap());

        let output = String::from_utf8(op.output).unwrap();
        assert!(output.contains("Merge into b3 stopped with conflicts"));
        assert!(output.contains("    src/lib.rs"));
        assert_eq!(output.matches("continue? [y/n]").count(), 3);
    }

    #[test]
    fn confirm_resume_declined() {
        let mut op = operator("no\n");
        assert!(!op.confirm_resume("b3", &[]).unwrap());
    }

    #[test]
    fn closed_input_is_an_error_not_consent() {
        let mut op = operator("");
        let err = op.confirm_resume("b3", &[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn inactive_branch_choices() {
        let mut op = operator("x\nm\no\n");
        assert_eq!(
            op.resolve_inactive_branch("b2").unwrap(),
            InactiveBranchChoice::MarkMerged
        );
        assert_eq!(
            op.resolve_inactive_branch("b2").unwrap(),
            InactiveBranchChoice::OpenNew
        );
    }
}
