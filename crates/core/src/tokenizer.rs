//! Splits typed input into [`Argument`]s.
//!
//! Tokenizing is lossless: joining the `to_string()` of every argument gives
//! back the input exactly, which is what lets the requisition map cursor
//! positions onto arguments and rewrite single arguments in place.
//!
//! Escapes are kept verbatim in the token text. An escaped character never
//! opens, closes or separates a region; turning `\n` into a newline is the job
//! of the string type (see [`unescape`]).

use log::trace;

use crate::argument::Argument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Whitespace,
    Simple,
    SingleQuote,
    DoubleQuote,
    Script,
}

/// Splits `typed` into arguments.
///
/// Empty input produces exactly one blank argument.
///
/// # Examples
///
/// ```
/// use quill_core::argument::Argument;
/// use quill_core::tokenizer::tokenize;
///
/// let args = tokenize("echo \"a b\" c");
/// assert_eq!(
///     args,
///     vec![
///         Argument::new("echo", "", ""),
///         Argument::new("a b", " \"", "\""),
///         Argument::new("c", " ", ""),
///     ]
/// );
/// ```
pub fn tokenize(typed: &str) -> Vec<Argument> {
    if typed.is_empty() {
        return vec![Argument::blank()];
    }

    if is_simple(typed) {
        return vec![Argument::new(typed, "", "")];
    }

    let chars: Vec<char> = typed.chars().collect();
    let slice = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

    let mut mode = Mode::Whitespace;
    let mut args: Vec<Argument> = Vec::new();
    let mut start = 0;
    let mut prefix = String::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        // Width of the current character including a following escaped one
        let step = if c == '\\' && i + 1 < chars.len() { 2 } else { 1 };

        match mode {
            Mode::Whitespace => match c {
                '\'' => {
                    prefix = slice(start, i + 1);
                    mode = Mode::SingleQuote;
                    start = i + 1;
                }
                '"' => {
                    prefix = slice(start, i + 1);
                    mode = Mode::DoubleQuote;
                    start = i + 1;
                }
                '{' => {
                    prefix = slice(start, i + 1);
                    mode = Mode::Script;
                    depth = 1;
                    start = i + 1;
                }
                ' ' => {}
                _ => {
                    prefix = slice(start, i);
                    mode = Mode::Simple;
                    start = i;
                }
            },
            Mode::Simple => {
                if c == ' ' {
                    args.push(Argument::new(slice(start, i), std::mem::take(&mut prefix), ""));
                    mode = Mode::Whitespace;
                    start = i;
                }
            }
            Mode::SingleQuote | Mode::DoubleQuote => {
                let closer = if mode == Mode::SingleQuote { '\'' } else { '"' };
                if c == closer {
                    args.push(Argument::new(
                        slice(start, i),
                        std::mem::take(&mut prefix),
                        c.to_string(),
                    ));
                    mode = Mode::Whitespace;
                    start = i + 1;
                }
            }
            Mode::Script => {
                if c == '{' {
                    depth += 1;
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        args.push(Argument::script(
                            slice(start, i),
                            std::mem::take(&mut prefix),
                            "}",
                        ));
                        mode = Mode::Whitespace;
                        start = i + 1;
                    }
                }
            }
        }

        i += step;
    }

    // Tidy up whatever the input ended in
    let end = chars.len();
    match mode {
        Mode::Whitespace => {
            if start != end {
                let extra = slice(start, end);
                match args.last_mut() {
                    Some(last) => last.push_suffix(&extra),
                    None => args.push(Argument::new("", extra, "")),
                }
            }
        }
        Mode::Script => args.push(Argument::script(slice(start, end), prefix, "")),
        Mode::Simple | Mode::SingleQuote | Mode::DoubleQuote => {
            args.push(Argument::new(slice(start, end), prefix, ""));
        }
    }

    trace!("Tokenized {:?} into {} argument(s)", typed, args.len());
    args
}

/// True if the input needs no state machine: no spaces, quotes, braces or
/// escapes.
fn is_simple(typed: &str) -> bool {
    !typed
        .chars()
        .any(|c| matches!(c, ' ' | '"' | '\'' | '{' | '}' | '\\'))
}

/// Resolves the escapes that may appear in typed text.
///
/// `\\` is handled first so that `\\n` stays a backslash followed by `n`.
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('b') => unescaped.push('\u{8}'),
            Some('f') => unescaped.push('\u{c}'),
            Some('v') => unescaped.push('\u{b}'),
            Some(other @ ('\\' | ' ' | '\'' | '"' | '{' | '}')) => unescaped.push(other),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }

    unescaped
}

/// The inverse of [`unescape`]: makes text safe to type as a single token.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            '\u{8}' => escaped.push_str("\\b"),
            '\u{c}' => escaped.push_str("\\f"),
            '\u{b}' => escaped.push_str("\\v"),
            ' ' | '\'' | '"' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(args: &[Argument]) -> String {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_input_is_one_blank() {
        let args = tokenize("");
        assert_eq!(args.len(), 1);
        assert!(args[0].is_unset());
    }

    #[test]
    fn test_simple_input_fast_path() {
        assert_eq!(tokenize("echo"), vec![Argument::new("echo", "", "")]);
    }

    #[test]
    fn test_quoted_region() {
        let args = tokenize("echo \"a b\" c");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Argument::new("echo", "", ""));
        assert_eq!(args[1], Argument::new("a b", " \"", "\""));
        assert_eq!(args[2], Argument::new("c", " ", ""));
    }

    #[test]
    fn test_single_quotes() {
        let args = tokenize("a 'b c' ");
        assert_eq!(args[1].text(), "b c");
        assert_eq!(args[1].prefix(), " '");
        assert_eq!(args[1].suffix(), "' ");
    }

    #[test]
    fn test_trailing_whitespace_attaches_to_last() {
        let args = tokenize("tsv  ");
        assert_eq!(args, vec![Argument::new("tsv", "", "  ")]);
    }

    #[test]
    fn test_whitespace_only_input() {
        let args = tokenize("   ");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].text(), "");
        assert_eq!(args[0].prefix(), "   ");
    }

    #[test]
    fn test_script_block_with_nested_braces() {
        let args = tokenize("{ if x { y } } z");
        assert_eq!(args.len(), 2);
        assert!(args[0].is_script());
        assert_eq!(args[0].text(), "if x { y }");
        assert_eq!(args[0].prefix(), "{ ");
        assert_eq!(args[0].suffix(), " }");
        assert_eq!(args[1].text(), "z");
    }

    #[test]
    fn test_unterminated_script_flushes() {
        let args = tokenize("{ ls");
        assert_eq!(args.len(), 1);
        assert!(args[0].is_script());
        assert_eq!(args[0].text(), "ls");
        assert_eq!(args[0].suffix(), "");
        assert_eq!(joined(&args), "{ ls");
    }

    #[test]
    fn test_unterminated_quote_flushes() {
        let args = tokenize("say 'hello wor");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].text(), "hello wor");
        assert_eq!(args[1].prefix(), " '");
        assert_eq!(args[1].suffix(), "");
    }

    #[test]
    fn test_escaped_space_does_not_split() {
        let args = tokenize("cd a\\ b c");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].text(), "a\\ b");
        assert_eq!(unescape(args[1].text()), "a b");
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let args = tokenize("say 'it\\'s' x");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].text(), "it\\'s");
    }

    #[test]
    fn test_lossless_reconstruction() {
        let inputs = [
            "",
            "a",
            "  a  b ",
            "echo \"a b\" c",
            "x 'y",
            "{ a { b } c }  d",
            "{ unterminated { x",
            "a\\ b\\\\ 'c\\'d' \"e",
            "--flag -1 'é ü' ",
            "}{ stray",
        ];
        for input in inputs {
            assert_eq!(joined(&tokenize(input)), input, "input {input:?}");
        }
    }

    #[test]
    fn test_retokenize_is_stable() {
        let inputs = ["echo \"a b\" c", "a  'b c'  d ", "{ x } y", "a\\ b c"];
        for input in inputs {
            let first = tokenize(input);
            let second = tokenize(&joined(&first));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_unescape_sequences() {
        assert_eq!(unescape("a\\nb"), "a\nb");
        assert_eq!(unescape("a\\\\nb"), "a\\nb");
        assert_eq!(unescape("\\{x\\}"), "{x}");
        assert_eq!(unescape("odd\\q"), "odd\\q");
    }

    #[test]
    fn test_escape_round_trips() {
        let values = ["plain", "a b", "it's \"quoted\"", "tab\there", "back\\slash", "{x}"];
        for value in values {
            let escaped = escape(value);
            assert_eq!(tokenize(&escaped).len(), 1, "{escaped:?}");
            assert_eq!(unescape(&escaped), value);
        }
    }
}
