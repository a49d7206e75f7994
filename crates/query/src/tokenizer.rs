use crate::error::{QueryError, Result};
use std::iter;

/// One shell-style word of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Double quotes opened inside this word in the raw text
    pub quoted: bool,
}

/// Split a raw query into words, keeping double-quoted phrases together.
///
/// Unbalanced quoting is a [`QueryError::Malformed`].
pub fn tokenize(raw: &str) -> Result<Vec<Token>> {
    let words = shell_words::split(raw)
        .map_err(|err| QueryError::Malformed(format!("{err} in `{raw}`")))?;

    // shell_words drops the quotes; the flags come from a scan with the same word boundaries.
    let flags = double_quoted_words(raw);
    let tokens = words
        .into_iter()
        .zip(flags.into_iter().chain(iter::repeat(false)))
        .filter(|(word, _)| !word.trim().is_empty())
        .map(|(text, quoted)| Token { text, quoted })
        .collect();
    Ok(tokens)
}

#[derive(Clone, Copy)]
enum Scan {
    Between,
    BetweenEscape,
    Word,
    Escape,
    Single,
    Double,
    DoubleEscape,
    Comment,
}

/// One flag per shell word of `raw`, set when a double quote opens inside that word.
fn double_quoted_words(raw: &str) -> Vec<bool> {
    let mut flags = Vec::new();
    let mut state = Scan::Between;

    for ch in raw.chars() {
        state = match state {
            Scan::Between => match ch {
                ' ' | '\t' | '\n' => Scan::Between,
                '#' => Scan::Comment,
                '\\' => Scan::BetweenEscape,
                _ => {
                    flags.push(false);
                    in_word(ch, &mut flags)
                }
            },
            // A line continuation before any word starts none.
            Scan::BetweenEscape if ch == '\n' => Scan::Between,
            Scan::BetweenEscape => {
                flags.push(false);
                Scan::Word
            }
            Scan::Word => in_word(ch, &mut flags),
            Scan::Escape => Scan::Word,
            Scan::Single if ch == '\'' => Scan::Word,
            Scan::Single => Scan::Single,
            Scan::Double => match ch {
                '"' => Scan::Word,
                '\\' => Scan::DoubleEscape,
                _ => Scan::Double,
            },
            Scan::DoubleEscape => Scan::Double,
            Scan::Comment if ch == '\n' => Scan::Between,
            Scan::Comment => Scan::Comment,
        };
    }

    flags
}

fn in_word(ch: char, flags: &mut [bool]) -> Scan {
    match ch {
        ' ' | '\t' | '\n' => Scan::Between,
        '\'' => Scan::Single,
        '"' => {
            if let Some(quoted) = flags.last_mut() {
                *quoted = true;
            }
            Scan::Double
        }
        '\\' => Scan::Escape,
        _ => Scan::Word,
    }
}
