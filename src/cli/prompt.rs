//! Confirmation prompt for destructive commands.

use std::io::{self, BufRead, Write};

/// Asks a yes/no question and returns true only for an explicit yes.
///
/// End of input counts as no.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn confirm<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Asks on the terminal unless `assume_yes` is set.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or written.
pub fn confirm_on_terminal(question: &str, assume_yes: bool) -> io::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let stdin = io::stdin();
    let mut input = stdin.lock();
    confirm(question, &mut input, &mut io::stdout())
}
