//! Template parsing
//!
//! A template is literal text interleaved with `{{ ... }}` actions. Inside an
//! action: one operand (path, literal, or function call with arguments),
//! optionally piped through further calls. Pipes feed the previous value as
//! the final argument of the next call.

use serde_json::Value;

/// One parsed segment of a template
#[derive(Debug, Clone)]
pub(crate) enum Piece {
    /// Literal text, emitted verbatim
    Text(String),
    /// An interpolation action
    Action(Action),
}

/// A `{{ ... }}` action: an operand piped through zero or more calls
#[derive(Debug, Clone)]
pub(crate) struct Action {
    pub operand: Operand,
    pub pipes: Vec<Call>,
}

/// A value-producing expression inside an action
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    /// A string or number literal
    Literal(Value),
    /// A leading-dot path into the data root
    Path(String),
    /// A function call with inline arguments
    Call(Call),
}

/// A named function application
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub name: String,
    pub args: Vec<Operand>,
}

/// Parse a template into pieces
pub(crate) fn parse(template: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            pieces.push(Piece::Text(rest[..open].to_string()));
        }
        let after_open = &rest[open + 2..];
        let close = after_open
            .find("}}")
            .ok_or_else(|| "unclosed '{{'".to_string())?;

        pieces.push(Piece::Action(parse_action(&after_open[..close])?));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest.to_string()));
    }
    Ok(pieces)
}

fn parse_action(src: &str) -> Result<Action, String> {
    let segments = split_pipes(src)?;
    let mut iter = segments.into_iter();

    let first = iter.next().ok_or_else(|| "empty action".to_string())?;
    let operand = parse_command(&first, true)?;

    let mut pipes = Vec::new();
    for segment in iter {
        match parse_command(&segment, false)? {
            Operand::Call(call) => pipes.push(call),
            _ => return Err("pipe target must be a function".into()),
        }
    }

    Ok(Action { operand, pipes })
}

/// Split an action body on `|`, respecting quoted strings
fn split_pipes(src: &str) -> Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in src.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '|' => {
                    segments.push(std::mem::take(&mut current));
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if quote.is_some() {
        return Err("unterminated string".into());
    }
    segments.push(current);

    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err("empty pipeline segment".into());
    }
    Ok(segments)
}

/// Parse one pipeline segment
///
/// `allow_bare` permits a lone path or literal (the action's first segment);
/// later segments must be function calls.
fn parse_command(src: &str, allow_bare: bool) -> Result<Operand, String> {
    let tokens = tokenize(src)?;
    let mut iter = tokens.into_iter();
    let first = iter.next().ok_or_else(|| "empty action".to_string())?;

    match first {
        TemplateToken::Ident(name) => {
            let mut args = Vec::new();
            for token in iter {
                args.push(match token {
                    TemplateToken::Path(p) => Operand::Path(p),
                    TemplateToken::Literal(v) => Operand::Literal(v),
                    TemplateToken::Ident(nested) => {
                        return Err(format!("unexpected identifier '{nested}' in arguments"));
                    }
                });
            }
            Ok(Operand::Call(Call { name, args }))
        }
        TemplateToken::Path(path) => {
            if iter.next().is_some() {
                return Err("unexpected token after path".into());
            }
            if !allow_bare {
                return Err("pipe target must be a function".into());
            }
            Ok(Operand::Path(path))
        }
        TemplateToken::Literal(value) => {
            if iter.next().is_some() {
                return Err("unexpected token after literal".into());
            }
            if !allow_bare {
                return Err("pipe target must be a function".into());
            }
            Ok(Operand::Literal(value))
        }
    }
}

enum TemplateToken {
    Ident(String),
    Path(String),
    Literal(Value),
}

fn tokenize(src: &str) -> Result<Vec<TemplateToken>, String> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '"' | '\'' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == c => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => s.push(other),
                            None => return Err("unterminated escape".into()),
                        },
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated string".into()),
                    }
                }
                tokens.push(TemplateToken::Literal(Value::String(s)));
            }
            '.' => {
                let mut path = String::new();
                chars.next();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '[' || ch == ']' {
                        path.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if path.is_empty() {
                    return Err("bare '.' is not a path".into());
                }
                tokens.push(TemplateToken::Path(path));
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        num.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed: f64 = num.parse().map_err(|_| format!("invalid number '{num}'"))?;
                let value = if parsed.fract() == 0.0 {
                    Value::from(parsed as i64)
                } else {
                    Value::from(parsed)
                };
                tokens.push(TemplateToken::Literal(value));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(TemplateToken::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}
