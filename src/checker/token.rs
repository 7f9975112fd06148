use crate::core::domain::{CheckerResult, ContestantExecutionStatus};

/// Compares answer and output as sequences of whitespace-separated tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenChecker;

impl TokenChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, answer: &[u8], output: &[u8]) -> CheckerResult {
        let mut expected = tokens(answer);
        let mut found = tokens(output);
        let mut count = 0usize;

        loop {
            match (expected.next(), found.next()) {
                (None, None) => {
                    let noun = if count == 1 { "token" } else { "tokens" };
                    return CheckerResult::new(
                        ContestantExecutionStatus::Ok,
                        format!("ok {} {}", count, noun),
                    );
                }
                (Some(_), None) => {
                    return CheckerResult::new(
                        ContestantExecutionStatus::WrongAnswer,
                        format!(
                            "wrong answer answer contains more tokens than output ({} found)",
                            count
                        ),
                    );
                }
                (None, Some(_)) => {
                    return CheckerResult::new(
                        ContestantExecutionStatus::WrongAnswer,
                        format!(
                            "wrong answer participant output contains extra tokens after {}",
                            count
                        ),
                    );
                }
                (Some(e), Some(f)) => {
                    count += 1;
                    if e != f {
                        return CheckerResult::new(
                            ContestantExecutionStatus::WrongAnswer,
                            format!(
                                "wrong answer {}{} words differ - expected: '{}', found: '{}'",
                                count,
                                ordinal_suffix(count),
                                abbreviate(e),
                                abbreviate(f)
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn tokens(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    buf.split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}

fn ordinal_suffix(n: usize) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

const MAX_TOKEN_IN_MESSAGE: usize = 64;

fn abbreviate(token: &[u8]) -> String {
    let text = String::from_utf8_lossy(token);
    if text.chars().count() <= MAX_TOKEN_IN_MESSAGE {
        return text.into_owned();
    }
    let head: String = text.chars().take(MAX_TOKEN_IN_MESSAGE).collect();
    format!("{}...", head)
}
