//! Small lexical helpers shared by the USDA reader and writer.

/// Split `s` on `sep`, ignoring separators nested in brackets, parentheses,
/// quotes or asset paths.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut in_asset = false;
    let mut start = 0;

    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = in_quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                in_quote = None;
            }
            continue;
        }
        if in_asset {
            if c == '@' {
                in_asset = false;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_quote = Some(c),
            '@' => in_asset = true,
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Net bracket depth of a line, skipping quoted text.
///
/// Returns `(parens + brackets, braces)`.
pub(crate) fn bracket_balance(s: &str) -> (i32, i32) {
    let mut round = 0;
    let mut curly = 0;
    let mut in_quote: Option<char> = None;
    let mut in_asset = false;

    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if let Some(q) = in_quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                in_quote = None;
            }
            continue;
        }
        if in_asset {
            if c == '@' {
                in_asset = false;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_quote = Some(c),
            '@' => in_asset = true,
            '(' | '[' => round += 1,
            ')' | ']' => round -= 1,
            '{' => curly += 1,
            '}' => curly -= 1,
            _ => {}
        }
    }
    (round, curly)
}

/// Length in bytes of the first balanced expression at the start of `s`.
///
/// An expression is a quoted string, an asset path (optionally followed by a
/// `<prim>` target), a bracketed group or a bare word.
pub(crate) fn leading_expression_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return 0;
    }

    match bytes[0] {
        b'"' | b'\'' => {
            let quote = bytes[0];
            if s.starts_with("\"\"\"") {
                return s[3..].find("\"\"\"").map_or(s.len(), |end| end + 6);
            }
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i] == quote {
                    return i + 1;
                }
                i += 1;
            }
            s.len()
        }
        b'@' => {
            let mut end = s[1..].find('@').map_or(s.len(), |e| e + 2);
            if s[end..].starts_with('<') {
                end = s[end..].find('>').map_or(s.len(), |e| end + e + 1);
            }
            end
        }
        b'(' | b'[' | b'<' => {
            let mut depth = 0i32;
            let mut in_quote = false;
            for (i, c) in s.char_indices() {
                if in_quote {
                    if c == '"' {
                        in_quote = false;
                    }
                    continue;
                }
                match c {
                    '"' => in_quote = true,
                    '(' | '[' | '<' => depth += 1,
                    ')' | ']' | '>' => {
                        depth -= 1;
                        if depth == 0 {
                            return i + 1;
                        }
                    }
                    _ => {}
                }
            }
            s.len()
        }
        _ => s
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .unwrap_or(s.len()),
    }
}

/// Strip quotes and resolve escapes of a USDA string literal.
pub(crate) fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 6 && s.starts_with("\"\"\"") && s.ends_with("\"\"\"") {
        return s[3..s.len() - 3].to_string();
    }
    let inner = if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote a string for USDA output.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Strip one level of enclosing `open`/`close` characters.
pub(crate) fn strip_enclosing(s: &str, open: char, close: char) -> Option<&str> {
    let s = s.trim();
    s.strip_prefix(open)?.strip_suffix(close).map(str::trim)
}
