//! Column details SQLite only keeps in the original `CREATE TABLE` text.

/// Per-column facts recovered from a table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnDefinition {
    pub name: String,
    pub auto_increment: bool,
    pub check_expression: Option<String>,
}

const TABLE_CONSTRAINTS: [&str; 5] = ["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// Parse the column definitions out of a `CREATE TABLE` statement.
///
/// Table-level constraints are skipped. Returns an empty list when the
/// statement has no parenthesized body (e.g. `CREATE TABLE t AS SELECT ...`).
pub(crate) fn column_definitions(create_sql: &str) -> Vec<ColumnDefinition> {
    let masked = mask_quoted(create_sql);
    let Some(open) = masked.iter().position(|&b| b == b'(') else {
        return Vec::new();
    };
    let Some(close) = matching_paren(&masked, open) else {
        return Vec::new();
    };

    split_top_level(&masked, open + 1, close)
        .into_iter()
        .filter_map(|(start, end)| parse_definition(create_sql, &masked, start, end))
        .collect()
}

fn parse_definition(sql: &str, masked: &[u8], start: usize, end: usize) -> Option<ColumnDefinition> {
    let text = &sql[start..end];
    let leading = text.len() - text.trim_start().len();
    let start = start + leading;
    let text = sql[start..end].trim_end();
    if text.is_empty() {
        return None;
    }

    let first_word = text
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if TABLE_CONSTRAINTS.contains(&first_word.as_str()) {
        return None;
    }

    let name = column_name(text)?;
    let masked_upper: Vec<u8> = masked[start..start + text.len()]
        .iter()
        .map(u8::to_ascii_uppercase)
        .collect();

    let auto_increment = find_keyword(&masked_upper, b"AUTOINCREMENT").is_some();
    let check_expression = find_keyword(&masked_upper, b"CHECK").and_then(|idx| {
        let open = idx
            + b"CHECK".len()
            + masked_upper[idx + b"CHECK".len()..]
                .iter()
                .position(|&b| b == b'(')?;
        let close = matching_paren(&masked_upper, open)?;
        Some(text[open + 1..close].trim().to_string())
    });

    Some(ColumnDefinition {
        name,
        auto_increment,
        check_expression,
    })
}

/// First token of a column definition, unquoted
fn column_name(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let close = match first {
        '"' => '"',
        '`' => '`',
        '[' => ']',
        '\'' => '\'',
        _ => {
            let name: String = text.chars().take_while(|c| !c.is_whitespace()).collect();
            return Some(name);
        }
    };

    let mut name = String::new();
    let mut rest = chars.peekable();
    while let Some(c) = rest.next() {
        if c == close {
            // Doubled delimiter is an escaped delimiter
            if close != ']' && rest.peek() == Some(&close) {
                rest.next();
                name.push(c);
                continue;
            }
            return Some(name);
        }
        name.push(c);
    }
    Some(name)
}

/// Byte copy of `sql` with the contents of quoted sections blanked out.
/// Delimiters are kept so positions line up with the original text.
fn mask_quoted(sql: &str) -> Vec<u8> {
    let mut out = sql.as_bytes().to_vec();
    let mut quote: Option<u8> = None;
    for byte in out.iter_mut() {
        match quote {
            Some(close) if *byte == close => quote = None,
            Some(_) => *byte = b' ',
            None => {
                quote = match *byte {
                    b'\'' => Some(b'\''),
                    b'"' => Some(b'"'),
                    b'`' => Some(b'`'),
                    b'[' => Some(b']'),
                    _ => None,
                }
            }
        }
    }
    out
}

fn matching_paren(masked: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &b) in masked.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(masked: &[u8], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut part_start = start;
    for idx in start..end {
        match masked[idx] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push((part_start, idx));
                part_start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push((part_start, end));
    parts
}

fn find_keyword(haystack: &[u8], keyword: &[u8]) -> Option<usize> {
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    haystack
        .windows(keyword.len())
        .enumerate()
        .find(|(idx, window)| {
            *window == keyword
                && (*idx == 0 || !is_word(haystack[idx - 1]))
                && haystack
                    .get(idx + keyword.len())
                    .map_or(true, |&b| !is_word(b))
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_autoincrement_and_checks() {
        let sql = r#"CREATE TABLE users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) > 0),
            "e-mail" TEXT UNIQUE DEFAULT 'CHECK(x)',
            age INTEGER check(age >= 0 AND (age < 200)),
            CONSTRAINT adult CHECK (age > 17)
        )"#;
        let defs = column_definitions(sql);

        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].name, "id");
        assert!(defs[0].auto_increment);
        assert_eq!(defs[1].check_expression.as_deref(), Some("length(name) > 0"));
        assert!(!defs[1].auto_increment);
        assert_eq!(defs[2].name, "e-mail");
        assert_eq!(defs[2].check_expression, None);
        assert_eq!(defs[3].check_expression.as_deref(), Some("age >= 0 AND (age < 200)"));
    }

    #[test]
    fn skips_table_constraints() {
        let sql = "CREATE TABLE posts(id INTEGER, user_id INTEGER, PRIMARY KEY (id), \
                   FOREIGN KEY (user_id) REFERENCES users(id))";
        let names: Vec<_> = column_definitions(sql).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["id", "user_id"]);
    }

    #[test]
    fn unquotes_bracketed_and_escaped_names() {
        let sql = r#"CREATE TABLE t([first name] TEXT, "say ""hi""" TEXT, `tick` INT)"#;
        let names: Vec<_> = column_definitions(sql).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["first name", "say \"hi\"", "tick"]);
    }

    #[test]
    fn no_body_means_no_columns() {
        assert!(column_definitions("CREATE TABLE t AS SELECT 1").is_empty());
    }
}
