//! Positional stat-name resolution for game-log categories.
//!
//! The provider's game-log endpoint returns each category's values as an
//! ordered, unlabeled sequence; which position means which stat depends on
//! the category and, failing that, on the player's position. This table is
//! the one piece of hard domain knowledge in the system and the orderings
//! must not be rearranged.

const PASSING: &[&str] = &[
    "completions",
    "attempts",
    "yards",
    "completion_pct",
    "yards_per_attempt",
    "touchdowns",
    "interceptions",
    "sacks",
    "sack_yards",
    "rating",
    "qbr",
    "longest",
    "rushing_attempts",
    "rushing_yards",
    "rushing_avg",
];

const RUSHING: &[&str] = &["attempts", "yards", "avg", "longest", "touchdowns"];

const RECEIVING: &[&str] = &["receptions", "yards", "avg", "longest", "touchdowns", "targets"];

const DEFENSE: &[&str] = &[
    "tackles",
    "solo",
    "assists",
    "sacks",
    "sack_yards",
    "tackles_for_loss",
    "passes_defended",
    "interceptions",
    "int_yards",
    "int_touchdowns",
];

const KICKING: &[&str] = &[
    "field_goals_made",
    "field_goals_attempted",
    "field_goal_pct",
    "longest_fg",
    "extra_points_made",
    "extra_points_attempted",
    "points",
];

/// Ordered stat names for a category, if the table knows it. Category
/// substrings take priority; the player's position is the fallback for the
/// categories the provider labels inconsistently.
fn stat_names_for(category: &str, position: Option<&str>) -> Option<&'static [&'static str]> {
    let category = category.to_lowercase();
    let position = position.map(str::to_lowercase).unwrap_or_default();

    if category.contains("passing") || position.contains("quarterback") {
        Some(PASSING)
    } else if category.contains("rushing") {
        Some(RUSHING)
    } else if category.contains("receiving") {
        Some(RECEIVING)
    } else if category.contains("defense") || category.contains("defensive") {
        Some(DEFENSE)
    } else if category.contains("kicking") || position.contains("kicker") {
        Some(KICKING)
    } else {
        None
    }
}

/// Name for position `index` of a category's value sequence. Unknown
/// categories and indices past the end of a known list get a generic
/// `stat_N` placeholder so the value is stored rather than dropped.
pub fn stat_name_for(category: &str, position: Option<&str>, index: usize) -> String {
    match stat_names_for(category, position) {
        Some(names) if index < names.len() => names[index].to_string(),
        _ => format!("stat_{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_index_five_is_touchdowns_for_any_position() {
        assert_eq!(stat_name_for("passing", None, 5), "touchdowns");
        assert_eq!(stat_name_for("Passing", Some("Wide Receiver"), 5), "touchdowns");
    }

    #[test]
    fn quarterback_position_implies_passing_for_odd_categories() {
        assert_eq!(stat_name_for("splits", Some("Quarterback"), 2), "yards");
    }

    #[test]
    fn kicker_position_implies_kicking() {
        assert_eq!(stat_name_for("scoring", Some("Place Kicker"), 0), "field_goals_made");
    }

    #[test]
    fn defensive_categories_match_both_spellings() {
        assert_eq!(stat_name_for("defense", None, 0), "tackles");
        assert_eq!(stat_name_for("defensive interceptions", None, 0), "tackles");
    }

    #[test]
    fn unknown_category_gets_generic_placeholders() {
        assert_eq!(stat_name_for("punting", None, 3), "stat_3");
    }

    #[test]
    fn indices_past_a_known_list_still_get_placeholders() {
        assert_eq!(stat_name_for("rushing", None, 17), "stat_17");
    }
}
