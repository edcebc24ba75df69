//! Text helpers for header and vocabulary matching
//!
//! Everything here works on normalized text: lowercase, separators and
//! punctuation turned into single spaces, edges trimmed.

/// Normalize a cell for matching: lowercase, collapse separators and whitespace
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein distance, giving up once it exceeds `max`
///
/// Returns None when the distance is larger than `max`.
pub fn bounded_edit_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }

        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

/// Whether `needle` occurs in `haystack` on word boundaries
pub fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// Whether any phrase occurs in `haystack` on word boundaries
pub fn find_phrase<'a, I>(haystack: &str, phrases: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    phrases
        .into_iter()
        .find(|phrase| contains_words(haystack, phrase))
}
