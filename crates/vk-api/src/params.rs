//! Call parameters and stored calls

use std::sync::Arc;

/// Ordered name/value parameters of an API call.
///
/// Names are unique: setting an existing name replaces its value in place,
/// keeping the position of the original entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParameters {
    entries: Vec<(String, String)>,
}

impl CallParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Add a parameter, or replace the value of an existing one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// `application/x-www-form-urlencoded` text in insertion order.
    pub fn to_form(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

/// Snapshot of a call taken when it is issued.
///
/// Recovery (re-authentication, rate-limit retry) replays exactly this
/// method and parameter set, whatever the caller did with its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCall {
    method: Arc<str>,
    params: Arc<CallParameters>,
}

impl StoredCall {
    pub fn new(method: &str, params: CallParameters) -> Self {
        Self {
            method: Arc::from(method),
            params: Arc::new(params),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &CallParameters {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut params = CallParameters::new()
            .with("user_id", "1")
            .with("message", "hi")
            .with("guid", "42");

        params.set("message", "hello");

        assert_eq!(params.len(), 3);
        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["user_id", "message", "guid"]);
        assert_eq!(params.get("message"), Some("hello"));
    }

    #[test]
    fn set_appends_new_names() {
        let mut params = CallParameters::new().with("a", "1");
        params.set("b", "2");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("b"), Some("2"));
    }

    #[test]
    fn remove_returns_value() {
        let mut params = CallParameters::new().with("a", "1").with("b", "2");
        assert_eq!(params.remove("a").as_deref(), Some("1"));
        assert_eq!(params.remove("a"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn form_encoding_keeps_order_and_escapes() {
        let params = CallParameters::new()
            .with("user_ids", "1,2,3")
            .with("message", "hi there & bye");
        assert_eq!(
            params.to_form(),
            "user_ids=1%2C2%2C3&message=hi+there+%26+bye"
        );
        assert_eq!(CallParameters::new().to_form(), "");
    }

    #[test]
    fn from_iterator_deduplicates() {
        let params: CallParameters = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some("3"));
    }

    #[test]
    fn stored_call_is_independent_of_caller_copy() {
        let mut params = CallParameters::new().with("offset", "0");
        let stored = StoredCall::new("friends.get", params.clone());
        params.set("offset", "100");

        assert_eq!(stored.method(), "friends.get");
        assert_eq!(stored.params().get("offset"), Some("0"));
    }
}
