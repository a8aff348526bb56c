//! CLI output formatting: colored JSON and small cell helpers for tables.

use colored::Colorize;

/// Prints a JSON value with syntax highlighting.
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", highlight_json(&json));
}

/// Colors a pretty-printed JSON document.
///
/// Keys are cyan, string values green, numbers yellow and literals
/// (`true`, `false`, `null`) magenta. Punctuation is left as is.
#[must_use]
pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut expect_value = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let mut literal = String::from('"');
                let mut escaped = false;
                for c in chars.by_ref() {
                    literal.push(c);
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        break;
                    }
                }
                let colored = if expect_value { literal.green() } else { literal.cyan() };
                out.push_str(&colored.to_string());
                expect_value = false;
            }
            ':' => {
                out.push(ch);
                expect_value = true;
            }
            ',' | '{' | '}' => {
                out.push(ch);
                expect_value = false;
            }
            '[' => {
                out.push(ch);
                expect_value = true;
            }
            c if c.is_ascii_digit() || c == '-' || c.is_ascii_alphabetic() => {
                let mut token = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || matches!(next, '.' | '-' | '+') {
                        token.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let colored = match token.as_str() {
                    "true" | "false" | "null" => token.magenta(),
                    _ => token.yellow(),
                };
                out.push_str(&colored.to_string());
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Truncates a string to a maximum number of characters, adding an ellipsis.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        let cut = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
        format!("{}…", &s[..cut])
    }
}

/// Formats a boolean as a colored check mark.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}

/// Placeholder for empty table cells.
#[must_use]
pub fn or_dash(value: &str) -> String {
    if value.is_empty() { "-".dimmed().to_string() } else { value.to_string() }
}
