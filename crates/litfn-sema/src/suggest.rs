use strsim::levenshtein;

/// Closest candidate within an edit distance that scales with the length of `name`.
pub fn closest_name<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let limit = match name.chars().count() {
        0..=2 => 1,
        3..=5 => 2,
        _ => 3,
    };
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= limit)
        .min_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.cmp(b)))
        .map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use super::closest_name;

    #[test]
    fn picks_nearest_visible_name() {
        let names = ["counter", "count", "total"];
        assert_eq!(closest_name("coutn", names), Some("count"));
        assert_eq!(closest_name("countr", names), Some("count"));
        assert_eq!(closest_name("zzzzzz", names), None);
    }

    #[test]
    fn ties_break_alphabetically() {
        assert_eq!(closest_name("ab", ["ac", "aa"]), Some("aa"));
    }
}
