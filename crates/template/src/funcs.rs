//! Built-in template functions
//!
//! The string helpers mirror the usual template toolbox: case conversion,
//! trimming, default-value coercion, and length. Enrichment functions are
//! dispatched by the engine, not here.

use serde_json::Value;

use crate::TemplateError;

/// Dispatch a built-in function
pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
    match name {
        "upper" => string_fn(name, args, |s| s.to_uppercase()),
        "lower" => string_fn(name, args, |s| s.to_lowercase()),
        "title" => string_fn(name, args, titlecase),
        "trim" => string_fn(name, args, |s| s.trim().to_string()),
        "default" => default_fn(args),
        "len" => len_fn(args),
        other => Err(TemplateError::UnknownFunction(other.to_string())),
    }
}

/// Render a value the way completed templates print it
///
/// The null sentinel prints as `<no value>`, matching what operators see
/// from a missing path or a failed enrichment lookup.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "<no value>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Extract an id argument for enrichment lookups
///
/// Only strings and numbers qualify; anything else (including the null
/// sentinel) means "no id" and short-circuits to a null result.
pub(crate) fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_fn(
    name: &str,
    args: Vec<Value>,
    f: impl Fn(&str) -> String,
) -> Result<Value, TemplateError> {
    let [arg] = args.as_slice() else {
        return Err(TemplateError::Call {
            name: name.to_string(),
            message: format!("expected 1 argument, got {}", args.len()),
        });
    };
    match arg {
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(TemplateError::Call {
            name: name.to_string(),
            message: format!("expected a string, got {other}"),
        }),
    }
}

fn titlecase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `default fallback value` picks the fallback when value is empty
///
/// Empty means null, the empty string, zero, false, or an empty list/map.
fn default_fn(args: Vec<Value>) -> Result<Value, TemplateError> {
    let [fallback, value] = args.as_slice() else {
        return Err(TemplateError::Call {
            name: "default".to_string(),
            message: format!("expected 2 arguments, got {}", args.len()),
        });
    };

    Ok(if is_empty(value) {
        fallback.clone()
    } else {
        value.clone()
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn len_fn(args: Vec<Value>) -> Result<Value, TemplateError> {
    let [arg] = args.as_slice() else {
        return Err(TemplateError::Call {
            name: "len".to_string(),
            message: format!("expected 1 argument, got {}", args.len()),
        });
    };
    let length = match arg {
        Value::String(s) => s.len(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(TemplateError::Call {
                name: "len".to_string(),
                message: format!("cannot take length of {other}"),
            });
        }
    };
    Ok(Value::from(length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_capitalizes_words() {
        assert_eq!(titlecase("node registration"), "Node Registration");
        assert_eq!(titlecase("already Capped"), "Already Capped");
        assert_eq!(titlecase(""), "");
    }

    #[test]
    fn default_picks_fallback_only_when_empty() {
        let out = default_fn(vec![json!("fb"), json!("")]).unwrap();
        assert_eq!(out, json!("fb"));

        let out = default_fn(vec![json!("fb"), json!("value")]).unwrap();
        assert_eq!(out, json!("value"));

        let out = default_fn(vec![json!("fb"), Value::Null]).unwrap();
        assert_eq!(out, json!("fb"));

        let out = default_fn(vec![json!("fb"), json!(0)]).unwrap();
        assert_eq!(out, json!("fb"));
    }

    #[test]
    fn len_rejects_scalars() {
        assert!(len_fn(vec![json!(12)]).is_err());
        assert_eq!(len_fn(vec![json!([1, 2, 3])]).unwrap(), json!(3));
        assert_eq!(len_fn(vec![json!({"a": 1})]).unwrap(), json!(1));
    }

    #[test]
    fn as_id_accepts_strings_and_numbers() {
        assert_eq!(as_id(&json!("web")), Some("web".to_string()));
        assert_eq!(as_id(&json!(7)), Some("7".to_string()));
        assert_eq!(as_id(&Value::Null), None);
        assert_eq!(as_id(&json!("")), None);
        assert_eq!(as_id(&json!({})), None);
    }

    #[test]
    fn stringify_prints_null_sentinel() {
        assert_eq!(stringify(&Value::Null), "<no value>");
        assert_eq!(stringify(&json!("x")), "x");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!([1])), "[1]");
    }
}
