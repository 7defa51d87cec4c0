//! `{{path}}` template engine.
//!
//! Rendering is two passes over the template:
//!
//! 1. every `{{path}}` placeholder is replaced by the value found at `path`;
//!    a path that does not resolve keeps its raw `{{path}}` text,
//! 2. every `{{#path}}...{{/path}}` section keeps its content only when the
//!    value at `path` is truthy.
//!
//! A template that is exactly one placeholder and resolves to a mapping or a
//! sequence yields that value itself instead of text (see [`render`]).
//!
//! Paths are dot-separated (`quote.data.rate`); numeric segments index into
//! sequences and a leading `$` on a segment is ignored.

use serde_json::Value;

/// How structured values are turned into text inside mixed templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    /// Compact JSON.
    #[default]
    Compact,
    /// Indented bullet outline, for human-facing output.
    Outline,
}

/// A source that template paths resolve against.
pub trait Lookup {
    /// Value at the dot-separated `path`, or `None` when it does not resolve.
    fn lookup(&self, path: &str) -> Option<&Value>;
}

impl Lookup for Value {
    fn lookup(&self, path: &str) -> Option<&Value> {
        get_value(path, self)
    }
}

/// Look up `path` in `context`.
///
/// An exact key equal to the whole path at the root wins over segment
/// walking. `None` is the absent marker: some segment did not resolve.
pub fn get_value<'a>(path: &str, context: &'a Value) -> Option<&'a Value> {
    let segments = split_path(path)?;

    if segments.len() > 1 {
        if let Some(value) = context.as_object().and_then(|root| root.get(&segments.join("."))) {
            return Some(value);
        }
    }
    walk(context, &segments)
}

/// Path segments with surrounding whitespace and a leading `$` removed.
/// `None` when any segment is empty.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path
        .split('.')
        .map(|segment| {
            let segment = segment.trim();
            segment.strip_prefix('$').unwrap_or(segment)
        })
        .collect();
    (!segments.iter().any(|s| s.is_empty())).then_some(segments)
}

/// Follow `segments` down from `root`; numeric segments index sequences.
pub fn walk<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Truthiness used by sections and branch conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render `template` against `context`.
///
/// When the template is exactly one placeholder and the value is a mapping
/// or a sequence, the value is returned unchanged. Every other template
/// renders to a string.
pub fn render(template: &str, context: &dyn Lookup) -> Value {
    if let Some(path) = single_placeholder(template) {
        return match context.lookup(path) {
            Some(value @ (Value::Object(_) | Value::Array(_))) => value.clone(),
            Some(value) => Value::String(stringify(value, TextStyle::Compact)),
            None => Value::String(template.to_string()),
        };
    }
    Value::String(render_text(template, context, TextStyle::Compact))
}

/// Render `template` to text, whatever it resolves to.
pub fn render_text(template: &str, context: &dyn Lookup, style: TextStyle) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let interpolated = interpolate(template, context, style);
    render_sections(&interpolated, context)
}

/// Render every string nested inside `value`; other scalars pass through.
pub fn resolve_value(value: &Value, context: &dyn Lookup) -> Value {
    match value {
        Value::String(template) => render(template, context),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// True when `text` still holds an unresolved placeholder.
pub fn has_placeholder(text: &str) -> bool {
    text.find("{{")
        .map(|start| text[start + 2..].contains("}}"))
        .unwrap_or(false)
}

/// Flatten a value into an indented bullet outline.
pub fn outline(value: &Value) -> String {
    let mut lines = Vec::new();
    push_outline(value, 0, &mut lines);
    lines.join("\n")
}

/// The path of a template made of exactly one `{{path}}` placeholder.
pub fn single_placeholder(template: &str) -> Option<&str> {
    let inner = template.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.starts_with(['#', '/']) {
        return None;
    }
    let path = inner.trim();
    (!path.is_empty()).then_some(path)
}

// ─── Internals ──────────────────────────────────────────────────────────

fn stringify(value: &Value, style: TextStyle) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) if style == TextStyle::Outline => outline(value),
        other => other.to_string(),
    }
}

/// Pass 1: substitute `{{path}}` placeholders, leaving section tags alone.
fn interpolate(template: &str, context: &dyn Lookup, style: TextStyle) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find("{{") {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 2..];
        let Some(close) = after_open.find("}}") else {
            rendered.push_str(&cursor[start..]);
            return rendered;
        };
        let token = &after_open[..close];
        let raw = &cursor[start..start + 2 + close + 2];
        cursor = &after_open[close + 2..];

        let path = token.trim();
        if path.is_empty() || token.starts_with(['#', '/']) {
            rendered.push_str(raw);
            continue;
        }

        match context.lookup(path) {
            Some(value) => {
                let structured = matches!(value, Value::Object(_) | Value::Array(_));
                if style == TextStyle::Outline
                    && structured
                    && !rendered.is_empty()
                    && !rendered.ends_with('\n')
                {
                    let kept = rendered.trim_end_matches([' ', '\t']).len();
                    rendered.truncate(kept);
                    rendered.push('\n');
                }
                rendered.push_str(&stringify(value, style));
            }
            None => {
                tracing::debug!("[template] Unresolved placeholder: {}", raw);
                rendered.push_str(raw);
            }
        }
    }

    rendered.push_str(cursor);
    rendered
}

/// Pass 2: keep or drop `{{#path}}...{{/path}}` sections.
fn render_sections(text: &str, context: &dyn Lookup) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut cursor = text;

    while let Some(start) = cursor.find("{{#") {
        rendered.push_str(&cursor[..start]);
        let after_hash = &cursor[start + 3..];
        let Some(close) = after_hash.find("}}") else {
            rendered.push_str(&cursor[start..]);
            return rendered;
        };
        let path = after_hash[..close].trim();
        let open_tag = &cursor[start..start + 3 + close + 2];
        let body = &after_hash[close + 2..];

        match find_section_end(body, path) {
            Some((content_end, resume)) => {
                if context.lookup(path).is_some_and(is_truthy) {
                    rendered.push_str(&render_sections(&body[..content_end], context));
                }
                cursor = &body[resume..];
            }
            None => {
                rendered.push_str(open_tag);
                cursor = body;
            }
        }
    }

    rendered.push_str(cursor);
    rendered
}

/// Locate the `{{/path}}` closing `path` in `body`, skipping nested
/// sections of the same path. Returns (content end, offset after the tag).
fn find_section_end(body: &str, path: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut offset = 0usize;

    while let Some(found) = body[offset..].find("{{") {
        let tag_start = offset + found;
        let after = &body[tag_start + 2..];
        let close = after.find("}}")?;
        let token = &after[..close];
        let tag_end = tag_start + 2 + close + 2;

        if let Some(inner) = token.strip_prefix('#') {
            if inner.trim() == path {
                depth += 1;
            }
        } else if let Some(inner) = token.strip_prefix('/') {
            if inner.trim() == path {
                if depth == 0 {
                    return Some((tag_start, tag_end));
                }
                depth -= 1;
            }
        }
        offset = tag_end;
    }
    None
}

fn push_outline(value: &Value, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, item) in map {
                if is_nested(item) {
                    lines.push(format!("{indent}- {key}:"));
                    push_outline(item, depth + 1, lines);
                } else {
                    lines.push(format!("{indent}- {key}: {}", leaf_text(item)));
                }
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                if is_nested(item) {
                    lines.push(format!("{indent}- [{}]", index + 1));
                    push_outline(item, depth + 1, lines);
                } else {
                    lines.push(format!("{indent}- {}", leaf_text(item)));
                }
            }
        }
        other => lines.push(format!("{indent}{}", leaf_text(other))),
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
