/// Ordered set of namespace patterns deciding which pods get archived.
///
/// A pattern ending in `*` matches by prefix, any other pattern must equal the
/// namespace exactly. A set consisting of the single pattern `*` matches every
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<String>,
}

impl PatternSet {
    /// Build a set from raw configuration entries. Entries are trimmed and
    /// empty ones dropped; nothing left means match-all.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if patterns.is_empty() {
            Self::match_all()
        } else {
            Self { patterns }
        }
    }

    pub fn match_all() -> Self {
        Self {
            patterns: vec!["*".to_string()],
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.patterns.len() == 1 && self.patterns[0] == "*"
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn should_archive(&self, namespace: &str) -> bool {
        if self.is_match_all() {
            return true;
        }

        self.patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => namespace.starts_with(prefix),
            None => namespace == pattern,
        })
    }
}
