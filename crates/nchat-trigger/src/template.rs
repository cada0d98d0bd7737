//! `{{path}}` template interpolation against a [`Context`].

use crate::context::Context;

/// Replace every `{{path}}` placeholder in `template` with the string
/// form of the value at `path` in `context`. A placeholder whose path
/// does not resolve is replaced with an empty string rather than left
/// in place or causing an error.
pub fn interpolate(template: &str, context: &Context) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated placeholder: emit the rest verbatim.
            output.push_str(&rest[start..]);
            return output;
        };
        let path = after_open[..end].trim();
        output.push_str(&render(context.get(path)));
        rest = &after_open[end + 2..];
    }
    output.push_str(rest);
    output
}

fn render(value: Option<&serde_json::Value>) -> String {
    match value {
        None => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interpolates_string_field() {
        let ctx = Context::new(json!({"user": {"name": "Ada"}}));
        assert_eq!(interpolate("Hello, {{user.name}}!", &ctx), "Hello, Ada!");
    }

    #[test]
    fn missing_path_becomes_empty_string() {
        let ctx = Context::new(json!({}));
        assert_eq!(interpolate("Hello, {{missing}}!", &ctx), "Hello, !");
    }

    #[test]
    fn interpolates_multiple_placeholders() {
        let ctx = Context::new(json!({"a": "1", "b": "2"}));
        assert_eq!(interpolate("{{a}}-{{b}}", &ctx), "1-2");
    }

    #[test]
    fn non_string_value_is_stringified() {
        let ctx = Context::new(json!({"count": 42}));
        assert_eq!(interpolate("count={{count}}", &ctx), "count=42");
    }

    #[test]
    fn unterminated_placeholder_is_emitted_verbatim() {
        let ctx = Context::new(json!({}));
        assert_eq!(interpolate("broken {{oops", &ctx), "broken {{oops");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let ctx = Context::new(json!({}));
        assert_eq!(interpolate("plain text", &ctx), "plain text");
    }
}
