use std::collections::BTreeSet;
use std::fmt;

/// Set of input topic names bound to one pipeline instance.
///
/// Never mutated in place once handed to a pipeline: growth produces a new
/// set via [`TopicSet::with_added`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSet(BTreeSet<String>);

impl TopicSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.0.contains(topic)
    }

    /// Topic names in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns a new set holding every current topic plus `topics`.
    pub fn with_added<I, S>(&self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.0.clone();
        next.extend(topics.into_iter().map(Into::into));
        Self(next)
    }
}

impl<S: Into<String>> FromIterator<S> for TopicSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TopicSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(","))
    }
}

/// Canonical `(id, chain, data)` triple derived from one CDC record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Hex SHA-256 of the raw value bytes as consumed.
    pub id: String,
    /// Entity base name followed by the canonical JSON of the key fields.
    pub chain: String,
    /// The `after` image; `Value::Null` for a delete.
    pub data: serde_json::Value,
}

impl CanonicalRecord {
    pub fn is_delete(&self) -> bool {
        self.data.is_null()
    }
}

/// Classified result of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The service accepted the record (HTTP 201).
    Created { provable_id: String },
    /// The service already holds this record (HTTP 409, error code 3).
    Conflict { existing_id: Option<String> },
    /// Anything else: transport error, unexpected status or body.
    TransientFailure { reason: String },
}

impl RegistrationOutcome {
    /// Whether the delivery loop may stop retrying.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationOutcome::TransientFailure { .. })
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        RegistrationOutcome::TransientFailure {
            reason: reason.into(),
        }
    }
}
