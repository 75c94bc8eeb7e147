//! Transient-error classification

/// Decides whether a failed attempt is worth retrying.
///
/// Control planes report propagation delays (a role that cannot be assumed
/// yet, a principal that is not visible yet) with ordinary error codes, so
/// each provider supplies its own classifier.
pub trait TransientClassifier<E: ?Sized>: Send + Sync {
    fn is_transient(&self, error: &E) -> bool;
}

impl<E: ?Sized, F> TransientClassifier<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_transient(&self, error: &E) -> bool {
        self(error)
    }
}

/// Treats every error as fatal
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTransient;

impl<E: ?Sized> TransientClassifier<E> for NeverTransient {
    fn is_transient(&self, _error: &E) -> bool {
        false
    }
}

/// Matches an error's rendered message against known substrings
#[derive(Debug, Clone, Default)]
pub struct MessageClassifier {
    patterns: Vec<String>,
}

impl MessageClassifier {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| message.contains(p.as_str()))
    }
}

impl<E: std::fmt::Display + ?Sized> TransientClassifier<E> for MessageClassifier {
    fn is_transient(&self, error: &E) -> bool {
        self.matches(&error.to_string())
    }
}
