//! Chat text helpers.

/// Formatting prefix understood by chat clients.
pub const SECTION_SIGN: char = '\u{a7}';

/// Translate `&`-style colour codes (`&6`, `&l`, ...) into section-sign codes.
///
/// An ampersand that is not followed by a valid code is kept as-is.
pub fn colorize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            if let Some(&next) = chars.peek() {
                if is_format_code(next) {
                    out.push(SECTION_SIGN);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Replace every `%name%` placeholder with its value.
pub fn substitute(template: &str, pairs: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in pairs {
        out = out.replace(&format!("%{name}%"), value);
    }
    out
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_translates_known_codes() {
        assert_eq!(colorize("&6Gold &lBold"), "\u{a7}6Gold \u{a7}lBold");
        assert_eq!(colorize("&C"), "\u{a7}c");
    }

    #[test]
    fn colorize_keeps_stray_ampersands() {
        assert_eq!(colorize("salt & pepper"), "salt & pepper");
        assert_eq!(colorize("trailing &"), "trailing &");
        assert_eq!(colorize("&zoo"), "&zoo");
    }

    #[test]
    fn substitute_replaces_all_occurrences() {
        let out = substitute(
            "X:%x% Z:%z% again %x%",
            &[("x", "10".to_string()), ("z", "-4".to_string())],
        );
        assert_eq!(out, "X:10 Z:-4 again 10");
    }
}
