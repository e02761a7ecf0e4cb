//! Label inference and descriptor string-list helpers.

/// Connector words kept lower-case in inferred labels.
const CONNECTOR_WORDS: &[&str] = &[
    "and", "but", "or", "nor", "for", "yet", "so", "as", "at", "by", "in", "of", "on", "to", "up",
    "a", "an", "the",
];

/// Infers a label from an object id by splitting at upper-case boundaries.
///
/// `showInFolder` becomes `show in Folder`.
pub fn id_to_text(id: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in id.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .map(|word| {
            let lower = word.to_lowercase();
            if CONNECTOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips mnemonic markers and a trailing ellipsis from a label.
///
/// `&Open...` becomes `Open`; `&&` keeps one literal `&`.
pub fn simplify_text(text: &str) -> String {
    let mut simplified = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '&' {
            if let Some(next) = chars.next() {
                simplified.push(next);
            }
            continue;
        }
        simplified.push(ch);
    }
    if let Some(stripped) = simplified.strip_suffix("...") {
        simplified.truncate(stripped.len());
    }
    simplified
}

/// Splits a `;`-separated list; `\` escapes the next character.
pub fn parse_string_list(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

/// Normalizes an explicit category list.
///
/// Empty segments before the last are dropped; an empty last segment is
/// replaced by the simplified label.
pub fn fix_categories(categories: Vec<String>, text: &str) -> Vec<String> {
    let Some((last, rest)) = categories.split_last() else {
        return vec![simplify_text(text)];
    };
    let mut fixed: Vec<String> = rest
        .iter()
        .filter(|segment| !segment.is_empty())
        .cloned()
        .collect();
    if last.is_empty() {
        fixed.push(simplify_text(text));
    } else {
        fixed.push(last.clone());
    }
    fixed
}

pub fn is_digits(value: &str) -> bool {
    value.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{fix_categories, id_to_text, is_digits, parse_string_list, simplify_text};

    #[test]
    fn infers_label_from_camel_case_id() {
        assert_eq!(id_to_text("showInFolder"), "show in Folder");
        assert_eq!(id_to_text("SaveAs"), "Save as");
        assert_eq!(id_to_text("ExportToPdf"), "Export to Pdf");
        assert_eq!(id_to_text("file"), "file");
    }

    #[test]
    fn simplifies_mnemonics_and_ellipsis() {
        assert_eq!(simplify_text("&Open..."), "Open");
        assert_eq!(simplify_text("Save && Close"), "Save & Close");
        assert_eq!(simplify_text("Tail&"), "Tail");
    }

    #[test]
    fn parses_escaped_string_lists() {
        assert_eq!(parse_string_list("Ctrl+S;Ctrl+Shift+S"), vec!["Ctrl+S", "Ctrl+Shift+S"]);
        assert_eq!(parse_string_list(r"a\;b;c"), vec!["a;b", "c"]);
        assert_eq!(parse_string_list(""), vec![""]);
    }

    #[test]
    fn fixes_explicit_categories() {
        let fixed = fix_categories(parse_string_list("File;;Recent;"), "&Open...");
        assert_eq!(fixed, vec!["File", "Recent", "Open"]);
        let fixed = fix_categories(parse_string_list("Edit;Undo"), "Undo");
        assert_eq!(fixed, vec!["Edit", "Undo"]);
    }

    #[test]
    fn digits_check_is_ascii_only() {
        assert!(is_digits("042"));
        assert!(!is_digits("a1"));
    }
}
