//! Dot-path resolution over a JSON value, used both by condition
//! evaluation and by template interpolation.

use serde_json::Value;

/// Read-only view over the data a trigger condition or template is
/// evaluated against — typically an incoming event payload.
#[derive(Debug, Clone)]
pub struct Context {
    root: Value,
}

impl Context {
    /// Wrap `root` as the context to resolve paths against.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Resolve a dot-separated path (e.g. `"user.email"` or
    /// `"items.0.name"`) against the context. Returns `None` if any
    /// segment does not exist.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.root, |current, segment| {
            if let Ok(index) = segment.parse::<usize>() {
                current.as_array().and_then(|arr| arr.get(index))
            } else {
                current.as_object().and_then(|obj| obj.get(segment))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_object_path() {
        let ctx = Context::new(json!({"user": {"email": "a@example.com"}}));
        assert_eq!(ctx.get("user.email").unwrap(), "a@example.com");
    }

    #[test]
    fn resolves_array_index() {
        let ctx = Context::new(json!({"items": [{"name": "first"}, {"name": "second"}]}));
        assert_eq!(ctx.get("items.1.name").unwrap(), "second");
    }

    #[test]
    fn missing_path_returns_none() {
        let ctx = Context::new(json!({"user": {}}));
        assert!(ctx.get("user.missing").is_none());
        assert!(ctx.get("missing.deeper").is_none());
    }

    #[test]
    fn out_of_bounds_index_returns_none() {
        let ctx = Context::new(json!({"items": [1, 2]}));
        assert!(ctx.get("items.5").is_none());
    }
}
