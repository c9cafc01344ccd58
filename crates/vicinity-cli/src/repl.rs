//! Line-oriented question loop shared by `ask` and `chat`.

use std::future::Future;
use std::io::{BufRead, Write};

use vicinity_core::Result;

/// Words that end the loop, compared case-insensitively.
pub const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

/// Whether `line` asks to leave the loop.
pub fn is_exit(line: &str) -> bool {
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// Read lines from `input`, answer each with `respond`, and echo the answer
/// to `output`.
///
/// Blank lines are ignored. The loop ends at end of input or on an exit
/// word. A failed answer is reported and the loop continues. Returns the
/// number of lines answered successfully.
pub async fn run_loop<R, W, F, Fut>(
    mut input: R,
    mut output: W,
    label: &str,
    mut respond: F,
) -> Result<usize>
where
    R: BufRead,
    W: Write,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut answered = 0;
    let mut line = String::new();

    loop {
        write!(output, "{label}> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit(text) {
            break;
        }

        match respond(text.to_string()).await {
            Ok(answer) => {
                writeln!(output, "{answer}\n")?;
                answered += 1;
            }
            Err(e) => {
                log::debug!("Answer failed: {e}");
                writeln!(output, "Error: {e}\n")?;
            }
        }
    }

    Ok(answered)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vicinity_core::Error;

    async fn echo(q: String) -> Result<String> {
        Ok(format!("echo: {q}"))
    }

    async fn run(input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let n = run_loop(Cursor::new(input.to_string()), &mut out, "Question", echo)
            .await
            .unwrap();
        (n, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_is_exit_case_insensitive() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("Exit"));
        assert!(!is_exit("exits"));
        assert!(!is_exit("quit now"));
    }

    #[tokio::test]
    async fn test_answers_until_exit() {
        let (n, out) = run("first\nsecond\nQuit\nnever\n").await;
        assert_eq!(n, 2);
        assert!(out.contains("echo: first"));
        assert!(out.contains("echo: second"));
        assert!(!out.contains("never"));
    }

    #[tokio::test]
    async fn test_stops_at_eof() {
        let (n, out) = run("only question").await;
        assert_eq!(n, 1);
        assert!(out.contains("echo: only question"));
        assert!(out.starts_with("Question> "));
    }

    #[tokio::test]
    async fn test_blank_lines_skipped() {
        let (n, _) = run("\n   \nhello\n").await;
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn test_errors_reported_and_loop_continues() {
        let mut out = Vec::new();
        let n = run_loop(
            Cursor::new("bad\ngood\nexit\n"),
            &mut out,
            "You",
            |q: String| async move {
                if q == "bad" {
                    Err(Error::upstream("connection refused"))
                } else {
                    Ok(q.to_uppercase())
                }
            },
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(n, 1);
        assert!(out.contains("Error: "));
        assert!(out.contains("connection refused"));
        assert!(out.contains("GOOD"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (n, out) = run("").await;
        assert_eq!(n, 0);
        assert_eq!(out, "Question> \n");
    }
}
