//! Text normalization, year extraction and stable content hashing.
//!
//! These helpers are shared by identity resolution and the graph builder.

/// Normalizes a title or surname for hashing and fuzzy comparison.
///
/// Lowercases the input after mapping the Turkish dotted capital `İ` to a plain
/// `I`. The mapping predates this implementation: existing content hashes in
/// the data set were computed that way, and changing it would orphan their
/// citation edges.
///
/// # Example
/// ```
/// use citenet::utilities::normalize;
///
/// assert_eq!(normalize("İstanbul Traffic"), "istanbul traffic");
/// assert_eq!(normalize("No Title"), "no title");
/// ```
pub fn normalize(text: &str) -> String {
    if text.contains('İ') {
        text.replace('İ', "I").to_lowercase()
    } else {
        text.to_lowercase()
    }
}

/// Generates a stable 64-bit content hash from a string.
///
/// Uses SHA-256 truncated to the first eight bytes. Stability across runs and
/// platforms is the point: these hashes key the article and keyword arenas and
/// are persisted by the external store.
///
/// # Example
/// ```
/// use citenet::utilities::hash_text;
///
/// let a = hash_text("graph theory");
/// let b = hash_text("graph theory");
/// assert_eq!(a, b);
/// assert_ne!(a, hash_text("graph theory "));
/// ```
pub fn hash_text(text: &str) -> u64 {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is at least 8 bytes"))
}

/// Extracts the publication year from a date string ("YYYY" or "YYYY-MM-DD").
///
/// Returns `None` for anything that does not start with four digits; callers
/// treat such articles as excluded from year-keyed statistics rather than
/// failing the run.
pub fn parse_year(date: &str) -> Option<i32> {
    if date.len() < 4 {
        return None;
    }
    date.get(0..4)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_ascii() {
        assert_eq!(normalize("Attack Graphs"), "attack graphs");
    }

    #[test]
    fn test_normalize_dotted_capital_i() {
        // Plain lowercase would yield "i\u{307}" and shift the hash basis.
        assert_eq!(normalize("İİ"), "ii");
    }

    #[test]
    fn test_hash_text_differs_on_case_after_normalize() {
        assert_ne!(hash_text("Title"), hash_text("title"));
        assert_eq!(hash_text(&normalize("Title")), hash_text("title"));
    }

    #[test]
    fn test_parse_year_variants() {
        assert_eq!(parse_year("2019-04-01"), Some(2019));
        assert_eq!(parse_year("1999"), Some(1999));
        assert_eq!(parse_year("n.d."), None);
        assert_eq!(parse_year(""), None);
    }
}
