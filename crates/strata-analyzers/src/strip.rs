//! Comment and string neutralizer shared by the regex-driven analyzers.
//!
//! Identifiers inside string literals or comments must never match the
//! extraction patterns, so source is pre-processed: every character inside a
//! `//` comment, a `/* ... */` comment, or a `"`/`'`/`` ` `` string literal is
//! replaced with a space. Line structure and column positions are preserved.
//!
//! Block comments span lines; strings do not — an unterminated quote resets
//! at the end of its line. Backslash escapes are honored inside strings.

/// Per-character scanner state. Only the block-comment state survives across
/// lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(char),
}

/// Neutralize comments and string literals in `source`.
///
/// The output has the same byte length and line layout as the input;
/// neutralized characters (including the delimiters) become spaces, one
/// space byte per input byte so offsets stay aligned.
pub fn neutralize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut escaped = false;

    fn blank(out: &mut String, c: char) {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            // Strings and line comments never cross a newline.
            if state != State::BlockComment {
                state = State::Code;
            }
            escaped = false;
            out.push('\n');
            continue;
        }

        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    chars.next();
                    out.push_str("  ");
                }
                '"' | '\'' | '`' => {
                    state = State::Str(c);
                    out.push(' ');
                }
                _ => out.push(c),
            },
            State::LineComment => blank(&mut out, c),
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::Str(quote) => {
                blank(&mut out, c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    state = State::Code;
                }
            }
        }
    }

    out
}

/// Neutralize comments only, leaving string literals intact.
///
/// Import and export extractors need the module paths inside quotes, so they
/// run over this form instead of the fully neutralized one. The same state
/// machine drives both passes.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut escaped = false;

    fn blank(out: &mut String, c: char) {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            if state != State::BlockComment {
                state = State::Code;
            }
            escaped = false;
            out.push('\n');
            continue;
        }

        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    chars.next();
                    out.push_str("  ");
                }
                '"' | '\'' | '`' => {
                    state = State::Str(c);
                    out.push(c);
                }
                _ => out.push(c),
            },
            State::LineComment => blank(&mut out, c),
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::Str(quote) => {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    state = State::Code;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comment_blanked() {
        let out = neutralize("let a = 1; // class Fake\nlet b = 2;");
        assert!(!out.contains("class"));
        assert!(out.contains("let a = 1;"));
        assert!(out.contains("let b = 2;"));
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let out = neutralize("before /* class A {\n  function f() {}\n*/ after");
        assert!(!out.contains("class"));
        assert!(!out.contains("function"));
        assert!(out.contains("before"));
        assert!(out.contains("after"));
    }

    #[test]
    fn test_string_contents_blanked() {
        let out = neutralize("const s = \"function fake()\";");
        assert!(!out.contains("fake"));
        assert!(out.starts_with("const s = "));
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let out = neutralize(r#"const s = "a\"b function"; const t = 1;"#);
        assert!(!out.contains("function"));
        assert!(out.contains("const t = 1;"));
    }

    #[test]
    fn test_unterminated_string_resets_at_newline() {
        let out = neutralize("const s = \"oops\nfunction real() {}");
        assert!(out.contains("function real()"));
    }

    #[test]
    fn test_template_literal_blanked() {
        let out = neutralize("const s = `class Hidden`; class Real {}");
        assert!(!out.contains("Hidden"));
        assert!(out.contains("class Real {}"));
    }

    #[test]
    fn test_layout_preserved() {
        let src = "a /* x */ b\n\"s\" c";
        let out = neutralize(src);
        assert_eq!(out.len(), src.len());
        assert_eq!(out.lines().count(), src.lines().count());
    }

    #[test]
    fn test_division_is_not_a_comment() {
        let out = neutralize("let half = total / 2;");
        assert_eq!(out, "let half = total / 2;");
    }

    #[test]
    fn test_strip_comments_keeps_strings() {
        let out = strip_comments("import { a } from './x'; // trailing");
        assert!(out.contains("'./x'"));
        assert!(!out.contains("trailing"));
    }

    #[test]
    fn test_strip_comments_ignores_slashes_in_strings() {
        let out = strip_comments("const url = \"https://example.com\";");
        assert!(out.contains("https://example.com"));
    }
}
