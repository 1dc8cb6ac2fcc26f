//! Container-scoped view cache keys.
//!
//! A `ViewKey` cannot be built without the container's replica id, so views
//! of two replicas never share a cache slot even when their names match.

/// A cache key scoped to one container.
///
/// Equality is exact and case-sensitive on both parts. The store itself
/// resolves view names case-insensitively, so `"ByDate"` and `"bydate"` are
/// distinct keys that may resolve to the same view; the canonical alias
/// registered by the cache is what joins them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Private inner data - cannot be constructed externally
    inner: ViewKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKeyInner {
    container_id: String,
    view_name: String,
}

impl ViewKey {
    /// Create a key from a container identity and a view name or alias.
    pub fn new(container_id: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            inner: ViewKeyInner {
                container_id: container_id.into(),
                view_name: view_name.into(),
            },
        }
    }

    /// Get the container identity this key is scoped to.
    pub fn container_id(&self) -> &str {
        &self.inner.container_id
    }

    /// Get the view name or alias.
    pub fn view_name(&self) -> &str {
        &self.inner.view_name
    }

    /// Key for another name in the same container.
    pub fn sibling(&self, view_name: impl Into<String>) -> Self {
        Self::new(self.inner.container_id.clone(), view_name)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Keys are equal exactly when both components are equal.
        #[test]
        fn prop_equality_is_componentwise(
            c1 in "[0-9A-F]{1,16}",
            c2 in "[0-9A-F]{1,16}",
            v1 in "[A-Za-z ]{1,12}",
            v2 in "[A-Za-z ]{1,12}",
        ) {
            let k1 = ViewKey::new(c1.clone(), v1.clone());
            let k2 = ViewKey::new(c2.clone(), v2.clone());
            prop_assert_eq!(k1 == k2, c1 == c2 && v1 == v2);
        }
    }
}
