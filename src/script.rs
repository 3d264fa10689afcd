use crate::error::{Error, Result};

/// One statement's raw text together with its 1-based starting line in the
/// script, so lexical and parse errors can point at the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStatement {
    pub text: String,
    pub start_line: usize,
}

/// Splits a script into `;`-terminated statement strings.
///
/// Semicolons inside single-quoted strings or `--` line comments do not
/// terminate a statement. Statements holding nothing but whitespace and
/// comments are dropped. Trailing content without a terminating `;` is an
/// "unterminated statement" error.
pub fn split_statements(source: &str) -> Result<Vec<ScriptStatement>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line: Option<usize> = None;
    let mut line = 1usize;
    let mut in_string = false;
    let mut in_comment = false;

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        // Nothing is accumulated before the statement's first meaningful
        // character, so the recorded start line matches the text handed to
        // the lexer exactly.
        let started = start_line.is_some();

        if c == '\n' {
            line += 1;
            in_comment = false;
            if started {
                current.push(c);
            }
            continue;
        }
        if in_comment {
            if started {
                current.push(c);
            }
            continue;
        }
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            current.push(c);
            continue;
        }

        match c {
            '\'' => {
                in_string = true;
                start_line.get_or_insert(line);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                in_comment = true;
                if started {
                    current.push(c);
                }
            }
            ';' => {
                // a ';' with nothing meaningful before it is dropped
                if let Some(first) = start_line.take() {
                    current.push(c);
                    statements.push(ScriptStatement {
                        text: std::mem::take(&mut current),
                        start_line: first,
                    });
                }
            }
            c if c.is_whitespace() => {
                if started {
                    current.push(c);
                }
            }
            _ => {
                start_line.get_or_insert(line);
                current.push(c);
            }
        }
    }

    if start_line.is_some() {
        return Err(Error::Parse {
            message: "unterminated statement".into(),
            line,
        });
    }

    Ok(statements)
}
