use inat_protocol::Taxon;

/// Four-letter bird banding code for a common name.
///
/// Hyphens separate words. One word: first four letters; two words: two letters each; three
/// words: one, one, two; four words: one letter each. Longer names have no code.
#[must_use]
pub fn banding_code(common_name: &str) -> Option<String> {
    let words: Vec<String> = common_name
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphabetic)
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .filter(|word| !word.is_empty())
        .collect();

    let code = match words.as_slice() {
        [one] => prefix(one, 4),
        [first, second] => prefix(first, 2) + &prefix(second, 2),
        [first, second, third] => prefix(first, 1) + &prefix(second, 1) + &prefix(third, 2),
        [first, second, third, fourth] => {
            prefix(first, 1) + &prefix(second, 1) + &prefix(third, 1) + &prefix(fourth, 1)
        }
        _ => return None,
    };
    (code.len() == 4).then_some(code)
}

fn prefix(word: &str, len: usize) -> String {
    word.chars().take(len).collect()
}

#[must_use]
pub fn is_bird(taxon: &Taxon) -> bool {
    taxon.lineage().any(|t| t.name.eq_ignore_ascii_case("Aves"))
}

/// A bird whose common name abbreviates to `code`.
#[must_use]
pub fn matches_banding_code(taxon: &Taxon, code: &str) -> bool {
    is_bird(taxon)
        && taxon
            .common_names
            .iter()
            .filter_map(|name| banding_code(name))
            .any(|candidate| candidate.eq_ignore_ascii_case(code))
}

/// `phrase` appears in one of the taxon's names as whole words, ignoring case.
#[must_use]
pub fn matches_phrase(taxon: &Taxon, phrase: &str) -> bool {
    taxon
        .names()
        .any(|name| contains_case_insensitive_words(name, phrase))
}

/// Scientific or common name starts with `text`, ignoring case.
#[must_use]
pub fn name_starts_with(taxon: &Taxon, text: &str) -> bool {
    let text = text.to_lowercase();
    std::iter::once(&taxon.name)
        .chain(taxon.common_names.iter())
        .any(|name| name.to_lowercase().starts_with(&text))
}

fn contains_case_insensitive_words(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let mut start = 0usize;
    while let Some(pos) = haystack[start..].find(&needle) {
        let idx = start + pos;
        let end = idx + needle.len();
        let before_ok = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = idx + haystack[idx..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use inat_protocol::Rank;

    #[test]
    fn banding_codes_follow_word_count() {
        assert_eq!(banding_code("Killdeer").as_deref(), Some("KILL"));
        assert_eq!(banding_code("American Robin").as_deref(), Some("AMRO"));
        assert_eq!(banding_code("White-throated Sparrow").as_deref(), Some("WTSP"));
        assert_eq!(banding_code("Cooper's Hawk").as_deref(), Some("COHA"));
        assert_eq!(
            banding_code("Black-crowned Night-Heron").as_deref(),
            Some("BCNH")
        );
        assert_eq!(banding_code("Sora").as_deref(), Some("SORA"));
        assert_eq!(banding_code("Emu"), None);
        assert_eq!(banding_code("One Two Three Four Five"), None);
    }

    #[test]
    fn banding_code_only_for_birds() {
        let sparrow = Taxon::new(9184, "Zonotrichia albicollis", Rank::Species)
            .common_name("White-throated Sparrow")
            .with_ancestors(vec![Taxon::new(3, "Aves", Rank::Class)]);
        assert!(matches_banding_code(&sparrow, "WTSP"));

        let mut impostor = sparrow.clone();
        impostor.ancestors = vec![Taxon::new(47158, "Insecta", Rank::Class)];
        assert!(!matches_banding_code(&impostor, "WTSP"));
    }

    #[test]
    fn phrase_requires_whole_words() {
        let bears = Taxon::new(41636, "Ursidae", Rank::Family).common_name("Bear Family");
        let bearberry = Taxon::new(51046, "Arctostaphylos uva-ursi", Rank::Species)
            .common_name("Bearberry");
        assert!(matches_phrase(&bears, "bear"));
        assert!(matches_phrase(&bears, "BEAR FAMILY"));
        assert!(!matches_phrase(&bearberry, "bear"));
        assert!(matches_phrase(&bearberry, "uva"));
        assert!(!matches_phrase(&bears, ""));
    }

    #[test]
    fn prefix_checks_scientific_and_common_names() {
        let robin =
            Taxon::new(12727, "Turdus migratorius", Rank::Species).common_name("American Robin");
        assert!(name_starts_with(&robin, "american"));
        assert!(name_starts_with(&robin, "turdus mig"));
        assert!(!name_starts_with(&robin, "robin"));
    }
}
