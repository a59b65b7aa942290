//! Named parameter storage for generated statements.

use crate::value::Value;

/// An ordered list of named parameters.
///
/// Generated placeholders are `:qp{n}` where `n` starts at the number of
/// parameters already bound and skips names a caller has taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder, e.g. `:qp0`.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        let mut n = self.entries.len();
        let mut name = format!("qp{n}");
        while self.get(&name).is_some() {
            n += 1;
            name = format!("qp{n}");
        }
        self.entries.push((name.clone(), value.into()));
        format!(":{name}")
    }

    /// Add a caller-named parameter. A leading `:` is ignored; an existing
    /// entry with the same name is replaced.
    pub fn push_named(&mut self, name: &str, value: impl Into<Value>) {
        let name = name.trim_start_matches(':');
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Look up a value by name (with or without the leading `:`).
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.trim_start_matches(':');
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Position of a named parameter in binding order.
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim_start_matches(':');
        self.entries.iter().position(|(n, _)| n == name)
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Values in binding order.
    pub fn values(&self) -> Vec<&Value> {
        self.entries.iter().map(|(_, v)| v).collect()
    }

    /// Merge another list's parameters into this one.
    pub fn extend(&mut self, other: &Params) {
        for (name, value) in &other.entries {
            self.push_named(name, value.clone());
        }
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.push_named(&name.into(), value);
        }
        params
    }
}
