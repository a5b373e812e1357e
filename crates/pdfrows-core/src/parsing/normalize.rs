use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize a header cell to a field name.
///
/// Steps:
/// 1. Decompose (NFKD) and drop combining marks, so "Variação" becomes "Variacao"
/// 2. Lowercase
/// 3. Replace every non-alphanumeric ASCII character with an underscore
/// 4. Collapse multiple underscores and trim them from both ends
pub fn slug(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut result = String::with_capacity(folded.len());
    let mut prev_underscore = true; // start true to skip leading underscores
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_underscore = false;
        } else {
            if !prev_underscore {
                result.push('_');
            }
            prev_underscore = true;
        }
    }
    // Trim trailing underscore
    if result.ends_with('_') {
        result.pop();
    }
    result
}

/// Turn raw header cells into unique field names.
///
/// Empty slugs become `field_<index>`, slugs starting with a digit get a
/// `field_` prefix, and repeated names are suffixed `_2`, `_3`, ...
pub fn make_header<S: AsRef<str>>(cells: &[S]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::with_capacity(cells.len());
    let mut seen: HashSet<String> = HashSet::new();

    for (index, cell) in cells.iter().enumerate() {
        let mut name = slug(cell.as_ref());
        if name.is_empty() {
            name = format!("field_{index}");
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            name = format!("field_{name}");
        }
        let name = unique_name(name, &seen);
        seen.insert(name.clone());
        fields.push(name);
    }
    fields
}

fn unique_name(name: String, seen: &HashSet<String>) -> String {
    if !seen.contains(&name) {
        return name;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{name}_{n}");
        if !seen.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
