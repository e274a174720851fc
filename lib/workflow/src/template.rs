//! Template resolution for node configuration strings.
//!
//! Configuration values may embed `{{path.to.value}}` placeholders that
//! are substituted from the node's data context at execution time. A
//! placeholder whose path does not resolve is left syntactically intact,
//! so unresolved templates stay visible downstream instead of silently
//! blanking out.

use serde_json::Value as JsonValue;

/// Walks a dot-separated path into a JSON context.
#[must_use]
pub fn lookup_path<'a>(context: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Resolves every `{{path}}` placeholder in the template against the context.
///
/// String values interpolate raw; other values interpolate as compact
/// JSON. Unresolvable placeholders (and unterminated `{{`) are kept
/// verbatim.
#[must_use]
pub fn resolve(template: &str, context: &JsonValue) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let raw = &after[..end];
                match lookup_path(context, raw.trim()) {
                    Some(value) => out.push_str(&render(value)),
                    None => {
                        out.push_str("{{");
                        out.push_str(raw);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolves a configuration value that may or may not be a string.
///
/// Non-string templates pass through unchanged.
#[must_use]
pub fn resolve_value(template: &JsonValue, context: &JsonValue) -> JsonValue {
    match template {
        JsonValue::String(s) => JsonValue::String(resolve(s, context)),
        other => other.clone(),
    }
}

fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_simple_placeholder() {
        let context = json!({"name": "Ada"});
        assert_eq!(resolve("Hello {{name}}!", &context), "Hello Ada!");
    }

    #[test]
    fn resolves_nested_path() {
        let context = json!({"user": {"address": {"city": "Lisbon"}}});
        assert_eq!(
            resolve("City: {{user.address.city}}", &context),
            "City: Lisbon"
        );
    }

    #[test]
    fn resolves_multiple_placeholders() {
        let context = json!({"a": "1", "b": "2"});
        assert_eq!(resolve("{{a}}+{{b}}", &context), "1+2");
    }

    #[test]
    fn unresolved_placeholder_stays_intact() {
        let context = json!({"known": "yes"});
        assert_eq!(
            resolve("{{known}} {{unknown.path}}", &context),
            "yes {{unknown.path}}"
        );
    }

    #[test]
    fn no_placeholders_is_identity() {
        let context = json!({});
        assert_eq!(resolve("plain text", &context), "plain text");
    }

    #[test]
    fn already_resolved_string_is_stable() {
        let context = json!({"x": "1"});
        let once = resolve("value is {{x}}", &context);
        let twice = resolve(&once, &context);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_values_render_as_json() {
        let context = json!({"count": 3, "flags": {"on": true}});
        assert_eq!(resolve("n={{count}}", &context), "n=3");
        assert_eq!(resolve("f={{flags}}", &context), "f={\"on\":true}");
    }

    #[test]
    fn placeholder_path_is_trimmed() {
        let context = json!({"name": "Ada"});
        assert_eq!(resolve("{{ name }}", &context), "Ada");
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let context = json!({"x": "1"});
        assert_eq!(resolve("open {{x", &context), "open {{x");
    }

    #[test]
    fn non_string_template_passes_through() {
        let context = json!({"x": "1"});
        let template = json!({"literal": true});
        assert_eq!(resolve_value(&template, &context), template);
    }

    #[test]
    fn lookup_path_missing_step_is_none() {
        let context = json!({"a": {"b": 1}});
        assert!(lookup_path(&context, "a.c").is_none());
        assert!(lookup_path(&context, "a.b.c").is_none());
        assert_eq!(lookup_path(&context, "a.b"), Some(&json!(1)));
    }
}
