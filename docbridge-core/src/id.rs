//! Short, collision-resistant string identifiers.
//!
//! Identifiers are random base-36 sequences. They are only probabilistically
//! unique; callers that need hard uniqueness rely on the backend-native
//! reference instead.

use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of an unseeded identifier.
pub const ID_LENGTH: usize = 10;

/// Length of the random suffix appended to a seeded identifier.
pub const SUFFIX_LENGTH: usize = 6;

/// Returns a random base-36 identifier of [`ID_LENGTH`] characters.
pub fn new_id() -> String {
    random_base36(ID_LENGTH)
}

/// Returns `slugify(seed) + "_" + suffix` where the suffix is [`SUFFIX_LENGTH`]
/// random base-36 characters.
///
/// An empty slug (for example a seed made only of punctuation) degrades to an
/// unseeded identifier.
///
/// ```ignore
/// let id = docbridge::id::new_id_from("Blog Posts");
/// assert!(id.starts_with("blog_posts_"));
/// ```
pub fn new_id_from(seed: &str) -> String {
    let slug = slugify(seed);

    if slug.is_empty() {
        return new_id();
    }

    format!("{}_{}", slug, random_base36(SUFFIX_LENGTH))
}

/// Normalizes a collection name for uniqueness checks: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lowercases `value` and collapses every run of non-alphanumeric characters
/// into a single `_`, with no leading or trailing separator.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_separator = false;

    for ch in normalize_name(value).chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    slug
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();

    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_id_is_short_base36() {
        let id = new_id();

        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn seeded_id_keeps_normalized_name() {
        let id = new_id_from("  Blog Posts! ");

        assert!(id.starts_with("blog_posts_"));
        assert_eq!(id.len(), "blog_posts_".len() + SUFFIX_LENGTH);
    }

    #[test]
    fn punctuation_only_seed_falls_back() {
        assert_eq!(new_id_from("---").len(), ID_LENGTH);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello,  World__2024"), "hello_world_2024");
        assert_eq!(slugify("_x_"), "x");
    }

    #[test]
    fn ids_rarely_collide() {
        let ids = (0..1000).map(|_| new_id()).collect::<HashSet<_>>();

        assert_eq!(ids.len(), 1000);
    }
}
