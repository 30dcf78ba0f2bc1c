/// Keyword hygiene for subscriber preferences.
///
/// Preference forms deliver keywords as one free-text field with mixed
/// separators; the queue may also deliver a pre-split list. Both paths end
/// up in `normalize`.

/// Cap on keywords per task. Anything beyond this is silently dropped.
pub const MAX_KEYWORDS: usize = 20;

/// Split a raw preference string on `,` / `;` / `|` and normalize.
pub fn split_preference(raw: &str) -> Vec<String> {
    normalize(
        raw.replace([';', '|'], ",")
            .split(',')
            .map(|s| s.to_string()),
    )
}

/// Trim, drop single-character noise, dedup case-insensitively preserving
/// first occurrence, cap at `MAX_KEYWORDS`.
pub fn normalize(keywords: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in keywords {
        let kw = raw.trim();
        if kw.chars().count() <= 1 {
            continue;
        }
        if seen.insert(kw.to_lowercase()) {
            out.push(kw.to_string());
            if out.len() == MAX_KEYWORDS {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_all_separators() {
        let kws = split_preference("úklid; stavby | IT služby, doprava");
        assert_eq!(kws, vec!["úklid", "stavby", "IT služby", "doprava"]);
    }

    #[test]
    fn drops_single_characters_and_blanks() {
        let kws = split_preference("a, , IT, x, údržba");
        assert_eq!(kws, vec!["IT", "údržba"]);
    }

    #[test]
    fn dedups_case_insensitively() {
        let kws = split_preference("Stavby, stavby, STAVBY, mosty");
        assert_eq!(kws, vec!["Stavby", "mosty"]);
    }

    #[test]
    fn caps_at_max_keywords() {
        let raw: Vec<String> = (0..40).map(|i| format!("klíč{i}")).collect();
        assert_eq!(normalize(raw).len(), MAX_KEYWORDS);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(split_preference("").is_empty());
        assert!(normalize(Vec::new()).is_empty());
    }
}
