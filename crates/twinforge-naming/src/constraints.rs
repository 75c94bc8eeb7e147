//! Name constraints and the sanitiser

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex digest appended to lossy names
pub const DIGEST_LEN: usize = 8;

/// Characters a provider accepts in a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    /// `[A-Za-z0-9]`
    Alnum,
    /// `[A-Za-z0-9-]`
    AlnumHyphen,
    /// `[A-Za-z0-9-_]`
    AlnumHyphenUnderscore,
}

impl Charset {
    fn allows(&self, c: char) -> bool {
        match self {
            Charset::Alnum => c.is_ascii_alphanumeric(),
            Charset::AlnumHyphen => c.is_ascii_alphanumeric() || c == '-',
            Charset::AlnumHyphenUnderscore => c.is_ascii_alphanumeric() || c == '-' || c == '_',
        }
    }

    fn separator(&self) -> Option<char> {
        match self {
            Charset::Alnum => None,
            _ => Some('-'),
        }
    }
}

/// Constraints one provider places on one kind of resource name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameConstraints {
    pub min_len: usize,
    pub max_len: usize,
    pub charset: Charset,
    pub lowercase: bool,
    pub starts_with_letter: bool,
}

impl NameConstraints {
    pub const fn new(max_len: usize, charset: Charset) -> Self {
        Self {
            min_len: 1,
            max_len,
            charset,
            lowercase: false,
            starts_with_letter: false,
        }
    }

    pub const fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub const fn starting_with_letter(mut self) -> Self {
        self.starts_with_letter = true;
        self
    }

    pub const fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Whether `name` satisfies every constraint
    pub fn accepts(&self, name: &str) -> bool {
        let len = name.chars().count();
        len >= self.min_len
            && len <= self.max_len
            && name.chars().all(|c| self.charset.allows(c))
            && (!self.lowercase || !name.chars().any(|c| c.is_ascii_uppercase()))
            && (!self.starts_with_letter || name.starts_with(|c: char| c.is_ascii_alphabetic()))
    }

    /// Derive a conforming name from its structured parts.
    pub fn apply(&self, parts: &[&str]) -> String {
        let canonical = parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("-");

        let mut name: String = canonical
            .chars()
            .filter_map(|c| self.map_char(c))
            .collect();
        if self.starts_with_letter && !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            name.insert(0, 'x');
        }

        // A canonical name that already ends like a digest suffix could be
        // the digested form of another input, so it is digested as well
        if name == canonical && self.accepts(&name) && !has_digest_suffix(&name) {
            return name;
        }

        let digest = digest(parts);
        let separator = self.charset.separator();
        let budget = self
            .max_len
            .saturating_sub(DIGEST_LEN + separator.map_or(0, |_| 1));

        name.truncate(budget);
        while name.ends_with('-') || name.ends_with('_') {
            name.pop();
        }

        if name.is_empty() {
            // Keep the letter requirement satisfied
            if self.starts_with_letter {
                return format!("x{digest}");
            }
            return digest;
        }

        match separator {
            Some(sep) => format!("{name}{sep}{digest}"),
            None => format!("{name}{digest}"),
        }
    }

    fn map_char(&self, c: char) -> Option<char> {
        let c = if self.lowercase { c.to_ascii_lowercase() } else { c };
        if self.charset.allows(c) {
            return Some(c);
        }
        // Swap separators the charset cannot express for one it can
        match (c, self.charset.separator()) {
            ('_' | '-' | '.' | ' ', Some(sep)) => Some(sep),
            _ => None,
        }
    }
}

/// Whether `name` ends in `DIGEST_LEN` lowercase hex characters, the
/// shape every digested name ends in
fn has_digest_suffix(name: &str) -> bool {
    name.len() >= DIGEST_LEN
        && name
            .bytes()
            .rev()
            .take(DIGEST_LEN)
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Hex digest of the structured input. Parts are NUL-separated so that
/// `("a-b", "c")` and `("a", "b-c")` hash differently.
fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .take(DIGEST_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conforming_names_pass_through() {
        let c = NameConstraints::new(64, Charset::AlnumHyphenUnderscore);
        assert_eq!(c.apply(&["plant", "persister"]), "plant-persister");
        assert_eq!(c.apply(&["plant", "processor", "s_1"]), "plant-processor-s_1");
    }

    #[test]
    fn test_lossy_names_get_digest() {
        let c = NameConstraints::new(60, Charset::AlnumHyphen).lowercase();
        let name = c.apply(&["plant", "processor", "s_1"]);
        assert!(name.starts_with("plant-processor-s-1-"));
        assert_eq!(name.len(), "plant-processor-s-1-".len() + DIGEST_LEN);
        assert_ne!(name, c.apply(&["plant", "processor", "s-1"]));
    }

    #[test]
    fn test_alnum_only_storage() {
        let c = NameConstraints::new(24, Charset::Alnum).lowercase().min_len(3);
        let name = c.apply(&["my-factory-twin", "archive-storage"]);
        assert!(c.accepts(&name), "{name}");
        assert_eq!(name.len(), 24);
    }

    #[test]
    fn test_truncation_keeps_names_apart() {
        let c = NameConstraints::new(20, Charset::AlnumHyphen);
        let a = c.apply(&["plant", "digital-twin-data-connector"]);
        let b = c.apply(&["plant", "digital-twin-data-connector-last-entry"]);
        assert!(c.accepts(&a) && c.accepts(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_shaped_input_cannot_mimic_lossy_name() {
        let c = NameConstraints::new(60, Charset::AlnumHyphen).lowercase();
        let lossy = c.apply(&["plant", "processor", "s_1"]);
        let mimic = format!("s-1-{}", digest(&["plant", "processor", "s_1"]));
        assert_eq!(lossy, format!("plant-processor-{mimic}"));

        let named = c.apply(&["plant", "processor", &mimic]);
        assert_ne!(named, lossy);
        assert!(c.accepts(&named), "{named}");
    }

    #[test]
    fn test_digest_shaped_suffix() {
        assert!(has_digest_suffix("plant-processor-0123abcd"));
        assert!(has_digest_suffix("plantprocessor0123abcd"));
        assert!(!has_digest_suffix("plant-processor-s1"));
        assert!(!has_digest_suffix("plant-processor-0123ABCD"));
        assert!(!has_digest_suffix("abc"));
    }

    #[test]
    fn test_starts_with_letter() {
        let c = NameConstraints::new(63, Charset::AlnumHyphen).starting_with_letter();
        let name = c.apply(&["", "1st-unit"]);
        assert!(name.starts_with('x'));
        assert!(c.accepts(&name));
    }
}
