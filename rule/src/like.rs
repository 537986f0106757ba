//! EXPRESS `LIKE` wildcard matching.
//!
//! | char | matches                         |
//! |------|---------------------------------|
//! | `@`  | any letter                      |
//! | `^`  | any upper-case letter           |
//! | `!`  | any lower-case letter           |
//! | `?`  | any character                   |
//! | `#`  | any digit                       |
//! | `*`  | any number of characters        |
//! | `&`  | the remainder of the string     |
//! | `\`  | the next character, literally   |

use regex_lite::Regex;

use crate::error::{RuleError, RuleResult};

/// Translate a LIKE pattern into an anchored regular expression.
pub fn compile(pattern: &str) -> RuleResult<Regex> {
    let mut re = String::with_capacity(pattern.len() * 2 + 8);
    re.push_str("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '@' => re.push_str("[A-Za-z]"),
            '^' => re.push_str("[A-Z]"),
            '!' => re.push_str("[a-z]"),
            '?' => re.push('.'),
            '#' => re.push_str("[0-9]"),
            '*' | '&' => re.push_str(".*"),
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex_lite::escape(&escaped.to_string())),
                None => re.push_str(r"\\"),
            },
            other => re.push_str(&regex_lite::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| RuleError::invalid_pattern(pattern, e.to_string()))
}

/// Whether `text` matches the LIKE `pattern`.
pub fn matches(text: &str, pattern: &str) -> RuleResult<bool> {
    Ok(compile(pattern)?.is_match(text))
}
