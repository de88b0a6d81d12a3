use std::collections::{BTreeSet, HashMap};

/// Tokens that carry no signal in titles ("Director of Sales" vs
/// "Sales Director").
const TITLE_STOPWORDS: [&str; 4] = ["of", "the", "and", "for"];

/// Neutral floor for titles that are absent or share nothing. Different
/// systems label the same role differently, so disjoint titles are weak
/// counter-evidence, not proof of a mismatch.
const TITLE_NEUTRAL: f64 = 0.3;

/// Scores are reported to six decimal places. Keeps threshold comparisons
/// stable across summation order and float rounding.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

// ---------------------------------------------------------------------------
// Name similarity
// ---------------------------------------------------------------------------

/// Token-set overlap coefficient over folded name keys: `|A∩B| / min(|A|,|B|)`.
///
/// Order-insensitive, and a dropped middle name does not dilute a full match.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let common = set_a.intersection(&set_b).count();
    common as f64 / set_a.len().min(set_b.len()) as f64
}

// ---------------------------------------------------------------------------
// Title similarity
// ---------------------------------------------------------------------------

/// Synonym-table + classified-role overlap, scaled above the neutral floor.
///
/// Identical or synonym-equivalent titles reach 1.0; a shared
/// leadership/manager classification alone lifts the score halfway.
pub fn title_similarity(
    a_title: &str,
    a_flags: (bool, bool),
    b_title: &str,
    b_flags: (bool, bool),
    synonyms: &HashMap<String, String>,
) -> f64 {
    let tokens_a = title_tokens(a_title, synonyms);
    let tokens_b = title_tokens(b_title, synonyms);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return TITLE_NEUTRAL;
    }

    let common = tokens_a.intersection(&tokens_b).count();
    let token_overlap = common as f64 / tokens_a.len().min(tokens_b.len()) as f64;

    let class_overlap = if (a_flags.0 && b_flags.0) || (a_flags.1 && b_flags.1) {
        1.0
    } else {
        0.0
    };

    TITLE_NEUTRAL + (1.0 - TITLE_NEUTRAL) * token_overlap.max(0.5 * class_overlap)
}

fn title_tokens(title: &str, synonyms: &HashMap<String, String>) -> BTreeSet<String> {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    lowered
        .split_whitespace()
        .filter(|t| !TITLE_STOPWORDS.contains(t))
        .map(|t| synonyms.get(t).cloned().unwrap_or_else(|| t.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Structural compatibility
// ---------------------------------------------------------------------------

/// 1 = departments match exactly, 0.5 = a side lacks a department,
/// 0 = both present and differ.
pub fn structural_compatibility(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            if a.eq_ignore_ascii_case(b) {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifyConfig;

    #[test]
    fn name_overlap_tolerates_missing_middle_names_and_order() {
        assert_eq!(name_similarity("sarah johnson", "sarah johnson"), 1.0);
        assert_eq!(name_similarity("sarah marie johnson", "sarah johnson"), 1.0);
        assert_eq!(name_similarity("johnson sarah", "sarah johnson"), 1.0);
        assert_eq!(name_similarity("sarah johnson", "sarah smith"), 0.5);
        assert_eq!(name_similarity("sarah johnson", "robert chen"), 0.0);
        assert_eq!(name_similarity("", "sarah johnson"), 0.0);
    }

    #[test]
    fn unrelated_titles_sit_at_the_neutral_floor() {
        let synonyms = ClassifyConfig::default().title_synonyms;
        let score = title_similarity(
            "Master Agent",
            (false, false),
            "Marketing Director",
            (true, false),
            &synonyms,
        );
        assert_eq!(score, 0.3);
    }

    #[test]
    fn synonym_expansion_matches_abbreviated_titles() {
        let synonyms = ClassifyConfig::default().title_synonyms;
        let score = title_similarity(
            "Sales Mgr",
            (false, true),
            "Sales Manager",
            (false, true),
            &synonyms,
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn stopwords_do_not_split_equivalent_titles() {
        let synonyms = ClassifyConfig::default().title_synonyms;
        let score = title_similarity(
            "Director of Sales",
            (true, false),
            "Sales Director",
            (true, false),
            &synonyms,
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn shared_class_lifts_disjoint_titles_halfway() {
        let synonyms = ClassifyConfig::default().title_synonyms;
        let score = title_similarity(
            "Chief Executive Officer",
            (true, false),
            "Marketing Director",
            (true, false),
            &synonyms,
        );
        // floor + (1 - floor) * 0.5
        assert!((score - 0.65).abs() < 1e-12);
    }

    #[test]
    fn missing_title_is_neutral() {
        let synonyms = ClassifyConfig::default().title_synonyms;
        assert_eq!(
            title_similarity("", (false, false), "Clerk", (false, false), &synonyms),
            0.3
        );
    }

    #[test]
    fn structural_cases() {
        assert_eq!(structural_compatibility(Some("Marketing"), Some("marketing")), 1.0);
        assert_eq!(structural_compatibility(Some("Marketing"), None), 0.5);
        assert_eq!(structural_compatibility(None, None), 0.5);
        assert_eq!(structural_compatibility(Some("Marketing"), Some("Sales")), 0.0);
    }

    #[test]
    fn rounding_keeps_boundary_scores_exact() {
        // 0.6·1.0 + 0.25·0.3 + 0.15·0.5 accumulates float error just below
        // 0.75; six-decimal rounding restores the boundary.
        let raw = 0.6 * 1.0 + 0.25 * 0.3 + 0.15 * 0.5;
        assert!(raw < 0.75);
        assert_eq!(round6(raw), 0.75);
    }
}
