//! Dotted-path navigation over dynamic JSON values
//!
//! Payloads and diffs arrive as arbitrary JSON. Predicates, templates, and
//! the block builder all address into them with dotted paths
//! (`Payload.Job.ID`, `Payload.TaskGroups[0].Name`). Resolution never fails
//! hard: an absent key, an out-of-range index, or a scalar in the middle of
//! the path simply yields `None`.

use serde_json::Value;

/// Resolve a dotted path against a value
///
/// Segments are separated by `.`; a segment may carry one or more `[n]` list
/// indices (`Tasks[0]`), and a bare numeric segment indexes into a list
/// (`Tasks.0`). A leading dot is tolerated so template-style paths
/// (`.Payload.Services`) resolve unchanged.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in path.split('.') {
        current = descend(current, segment)?;
    }
    Some(current)
}

/// Resolve one path segment, including any trailing `[n]` indices
fn descend<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    let (name, indices) = split_indices(segment)?;

    let mut current = if name.is_empty() {
        value
    } else if let Ok(n) = name.parse::<usize>() {
        value.as_array()?.get(n)?
    } else {
        value.as_object()?.get(name)?
    };

    for index in indices {
        current = current.as_array()?.get(index)?;
    }
    Some(current)
}

/// Split `Tasks[0][1]` into `("Tasks", [0, 1])`; malformed brackets yield None
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(bracket) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };

    let (name, mut rest) = segment.split_at(bracket);
    let mut indices = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']')?;
        indices.push(stripped[..close].parse().ok()?);
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return None;
    }
    Some((name, indices))
}

/// View a value as a list, if it is one
pub fn as_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Render a scalar value the way templates print it
///
/// Strings print without quotes; everything else uses compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Job": {
                "ID": "web",
                "Version": 3,
                "TaskGroups": [
                    {"Name": "frontend", "Count": 2},
                    {"Name": "backend", "Count": 1}
                ]
            }
        })
    }

    #[test]
    fn resolves_nested_maps() {
        let v = sample();
        assert_eq!(lookup(&v, "Job.ID"), Some(&json!("web")));
        assert_eq!(lookup(&v, "Job.Version"), Some(&json!(3)));
    }

    #[test]
    fn leading_dot_is_tolerated() {
        let v = sample();
        assert_eq!(lookup(&v, ".Job.ID"), Some(&json!("web")));
    }

    #[test]
    fn resolves_list_indices() {
        let v = sample();
        assert_eq!(
            lookup(&v, "Job.TaskGroups[1].Name"),
            Some(&json!("backend"))
        );
        assert_eq!(lookup(&v, "Job.TaskGroups.0.Count"), Some(&json!(2)));
    }

    #[test]
    fn missing_paths_yield_none() {
        let v = sample();
        assert_eq!(lookup(&v, "Job.Missing"), None);
        assert_eq!(lookup(&v, "Job.TaskGroups[9]"), None);
        assert_eq!(lookup(&v, "Job.ID.Deeper"), None);
    }

    #[test]
    fn empty_path_returns_root() {
        let v = sample();
        assert_eq!(lookup(&v, ""), Some(&v));
    }

    #[test]
    fn malformed_index_yields_none() {
        let v = sample();
        assert_eq!(lookup(&v, "Job.TaskGroups[x]"), None);
        assert_eq!(lookup(&v, "Job.TaskGroups[0"), None);
    }

    #[test]
    fn display_prints_strings_bare() {
        assert_eq!(display(&json!("web")), "web");
        assert_eq!(display(&json!(3)), "3");
        assert_eq!(display(&json!(null)), "");
        assert_eq!(display(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
