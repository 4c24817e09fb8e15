//! Block-end detection helpers shared by the regex-driven analyzers.
//!
//! Brace languages scan forward from a declaration line matching `{`/`}`
//! pairs; Python scans by indentation. Both operate on neutralized source
//! (see [`crate::strip`]) so braces inside strings or comments don't count.

/// Find the 1-based end line of a brace-delimited block whose declaration
/// starts on `start_line` (1-based) of `stripped`.
///
/// Scans for the first `{` at or after the declaration line, then returns the
/// line on which the matching `}` closes. Returns `start_line` when no brace
/// opens within `lookahead` lines (single-line declarations), and the last
/// line when the block never closes.
pub fn brace_block_end(stripped: &str, start_line: u32, lookahead: u32) -> u32 {
    let lines: Vec<&str> = stripped.lines().collect();
    let start = (start_line as usize).saturating_sub(1);
    if start >= lines.len() {
        return start_line;
    }

    let mut depth: i32 = 0;
    let mut opened = false;
    for (offset, line) in lines[start..].iter().enumerate() {
        if !opened && offset as u32 > lookahead {
            return start_line;
        }
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth <= 0 {
                        return (start + offset + 1) as u32;
                    }
                }
                _ => {}
            }
        }
    }

    if opened {
        lines.len() as u32
    } else {
        start_line
    }
}

/// Indentation width of a line with tabs weighted as 4 columns.
pub fn indent_width(line: &str) -> u32 {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Find the 1-based end line of an indentation-delimited block (Python).
///
/// The block owns every following line that is blank or indented deeper than
/// the declaration line; trailing blank lines are not included.
pub fn indent_block_end(source: &str, start_line: u32) -> u32 {
    let lines: Vec<&str> = source.lines().collect();
    let start = (start_line as usize).saturating_sub(1);
    if start >= lines.len() {
        return start_line;
    }

    let base = indent_width(lines[start]);
    let mut end = start;
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if indent_width(line) <= base {
            break;
        }
        end = start + 1 + offset;
    }
    (end + 1) as u32
}

/// Extract the text of a brace-delimited function body starting at
/// `start_line` of the original (unstripped) source, using `stripped` to
/// locate the braces. Returns the source slice from the opening `{` through
/// the matching `}` inclusive.
pub fn brace_body_text(source: &str, stripped: &str, start_line: u32) -> Option<String> {
    let mut stripped_offset = 0;
    for (idx, line) in stripped.lines().enumerate() {
        if idx + 1 < start_line as usize {
            stripped_offset += line.len() + 1;
            continue;
        }
        break;
    }

    let bytes = stripped.as_bytes();
    let mut open = None;
    let mut depth: i32 = 0;
    for (i, &b) in bytes[stripped_offset..].iter().enumerate() {
        match b {
            b'{' => {
                if open.is_none() {
                    open = Some(stripped_offset + i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if open.is_some() && depth <= 0 {
                    let start = open?;
                    let end = stripped_offset + i + 1;
                    return Some(source.get(start..end)?.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Doc comment immediately above `decl_line` (1-based): either a contiguous
/// run of `//`-style lines or a `/* ... */` block whose closing delimiter
/// sits on the previous line. Comment markers are stripped from the result.
pub fn c_style_doc(source: &str, decl_line: u32) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let above = (decl_line as usize).checked_sub(2)?;
    let trimmed = lines.get(above)?.trim();

    if trimmed.starts_with("//") {
        let mut collected = Vec::new();
        let mut idx = above;
        loop {
            let line = lines.get(idx)?.trim();
            if let Some(text) = line.strip_prefix("///").or_else(|| line.strip_prefix("//")) {
                collected.push(text.trim());
            } else {
                break;
            }
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        collected.reverse();
        return Some(collected.join("\n"));
    }

    if trimmed.ends_with("*/") {
        let mut collected = Vec::new();
        let mut idx = above;
        loop {
            let line = lines.get(idx)?.trim();
            let cleaned = line
                .trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches('*')
                .trim();
            if !cleaned.is_empty() {
                collected.push(cleaned.to_string());
            }
            if line.starts_with("/*") || idx == 0 {
                break;
            }
            idx -= 1;
        }
        collected.reverse();
        if collected.is_empty() {
            return None;
        }
        return Some(collected.join("\n"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_block_end_simple() {
        let src = "func a() {\n  x()\n}\nfunc b() {}\n";
        assert_eq!(brace_block_end(src, 1, 2), 3);
        assert_eq!(brace_block_end(src, 4, 2), 4);
    }

    #[test]
    fn test_brace_block_end_nested() {
        let src = "class A {\n  m() {\n    if (x) {\n    }\n  }\n}\n";
        assert_eq!(brace_block_end(src, 1, 2), 6);
        assert_eq!(brace_block_end(src, 2, 2), 5);
    }

    #[test]
    fn test_brace_block_unclosed_runs_to_eof() {
        let src = "fn broken() {\n  let x = 1;\n";
        assert_eq!(brace_block_end(src, 1, 2), 2);
    }

    #[test]
    fn test_no_brace_within_lookahead() {
        let src = "type A = B;\nother\n";
        assert_eq!(brace_block_end(src, 1, 0), 1);
    }

    #[test]
    fn test_indent_width_tab_weight() {
        assert_eq!(indent_width("    x"), 4);
        assert_eq!(indent_width("\tx"), 4);
        assert_eq!(indent_width("\t  x"), 6);
        assert_eq!(indent_width("x"), 0);
    }

    #[test]
    fn test_indent_block_end() {
        let src = "class C:\n    def m(self):\n        pass\ndef f():\n    pass\n";
        assert_eq!(indent_block_end(src, 1), 3);
        assert_eq!(indent_block_end(src, 2), 3);
        assert_eq!(indent_block_end(src, 4), 5);
    }

    #[test]
    fn test_indent_block_skips_blank_lines() {
        let src = "def f():\n    a = 1\n\n    b = 2\nx = 3\n";
        assert_eq!(indent_block_end(src, 1), 4);
    }

    #[test]
    fn test_brace_body_text() {
        let src = "function f() { return 1; }\n";
        let stripped = crate::strip::neutralize(src);
        let body = brace_body_text(src, &stripped, 1).unwrap();
        assert_eq!(body, "{ return 1; }");
    }

    #[test]
    fn test_c_style_doc_line_comments() {
        let src = "// First line.\n// Second line.\nfn f() {}\n";
        assert_eq!(
            c_style_doc(src, 3).as_deref(),
            Some("First line.\nSecond line.")
        );
    }

    #[test]
    fn test_c_style_doc_block_comment() {
        let src = "/**\n * Does things.\n */\nfunction f() {}\n";
        assert_eq!(c_style_doc(src, 4).as_deref(), Some("Does things."));
    }

    #[test]
    fn test_c_style_doc_single_line_block() {
        let src = "/** Greets. */\nfunction f() {}\n";
        assert_eq!(c_style_doc(src, 2).as_deref(), Some("Greets."));
    }

    #[test]
    fn test_no_doc() {
        let src = "let x = 1;\nfn f() {}\n";
        assert_eq!(c_style_doc(src, 2), None);
    }
}
