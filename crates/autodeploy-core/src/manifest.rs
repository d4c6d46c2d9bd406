//! Manifest store for `configuration.yaml`.
//!
//! The manifest maps `schema -> object type -> object name -> status`. It is
//! parsed into an ordered hierarchy of entries while the raw source text is
//! kept alongside, together with the position of every leaf value. Saving
//! rewrites only the leaves whose status changed, in place on their own line,
//! so comments, quoting, indentation and key order survive a run.
//!
//! Leaves that cannot be located in the source (flow-style mappings such as
//! `views: {v_orders: deploy}`) force a full re-render from the parsed tree,
//! which keeps order but drops comments.

use crate::error::{DeployError, Result};
use crate::io;
use crate::types::DeployStatus;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// DeploymentUnit
// ---------------------------------------------------------------------------

/// One `(schema, object type, object name)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentUnit {
    pub schema: String,
    pub object_type: String,
    pub name: String,
}

impl DeploymentUnit {
    pub fn new(
        schema: impl Into<String>,
        object_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            object_type: object_type.into(),
            name: name.into(),
        }
    }

    fn key(&self) -> LeafKey {
        (
            self.schema.clone(),
            self.object_type.clone(),
            self.name.clone(),
        )
    }
}

impl fmt::Display for DeploymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.schema, self.object_type, self.name)
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub status: DeployStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeEntry {
    pub name: String,
    pub objects: Vec<ObjectEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub name: String,
    pub object_types: Vec<ObjectTypeEntry>,
}

// ---------------------------------------------------------------------------
// Formatting context
// ---------------------------------------------------------------------------

type LeafKey = (String, String, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteStyle {
    Plain,
    Single,
    Double,
}

impl QuoteStyle {
    fn render(self, value: &str) -> String {
        match self {
            QuoteStyle::Single => format!("'{}'", value.replace('\'', "''")),
            QuoteStyle::Plain if is_plain_safe(value) => value.to_string(),
            QuoteStyle::Plain | QuoteStyle::Double => {
                format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

fn is_plain_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !value.starts_with('-')
}

/// Byte range of a leaf value within one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LeafSpan {
    line: usize,
    start: usize,
    end: usize,
    quote: QuoteStyle,
    text: String,
}

/// Opaque formatting metadata captured at load time.
#[derive(Debug, Clone, PartialEq)]
struct FormatContext {
    source: String,
    tree: Value,
    spans: HashMap<LeafKey, LeafSpan>,
}

impl FormatContext {
    fn original_text(&self, key: &LeafKey) -> Option<String> {
        let schema = child(&self.tree, &key.0)?;
        let object_type = child(schema, &key.1)?;
        let leaf = child(object_type, &key.2)?;
        leaf_text(leaf).ok()
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub schemas: Vec<SchemaEntry>,
    format: FormatContext,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| DeployError::ManifestRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_source(source).map_err(|reason| DeployError::ManifestRead {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a manifest held in memory.
    pub fn parse(source: &str) -> Result<Self> {
        Self::from_source(source.to_string()).map_err(|reason| DeployError::ManifestRead {
            path: PathBuf::from("<string>"),
            reason,
        })
    }

    /// Overwrite `path` with the current statuses.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.render().map_err(|e| DeployError::ManifestWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        io::atomic_write(path, data.as_bytes()).map_err(|e| DeployError::ManifestWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Serialize the manifest, preserving the loaded formatting where possible.
    pub fn render(&self) -> Result<String> {
        let mut edits: Vec<(&LeafSpan, &DeployStatus)> = Vec::new();
        let mut unlocated = Vec::new();

        for (unit, status) in self.units() {
            let key = unit.key();
            if self.format.original_text(&key).as_deref() == Some(status.as_str()) {
                continue;
            }
            match self.format.spans.get(&key) {
                Some(span) => edits.push((span, status)),
                None => unlocated.push(unit),
            }
        }

        if !unlocated.is_empty() {
            tracing::warn!(
                "Could not locate {} manifest entries in the source; comments and formatting will not be preserved",
                unlocated.len()
            );
            return self.render_tree();
        }
        if edits.is_empty() {
            return Ok(self.format.source.clone());
        }

        let mut lines: Vec<String> = self
            .format
            .source
            .split_inclusive('\n')
            .map(str::to_string)
            .collect();
        for (span, status) in edits {
            let replacement = span.quote.render(status.as_str());
            if let Some(line) = lines.get_mut(span.line) {
                line.replace_range(span.start..span.end, &replacement);
            }
        }
        Ok(lines.concat())
    }

    /// Every leaf in stored order: schemas, then object types, then objects.
    pub fn units(&self) -> impl Iterator<Item = (DeploymentUnit, &DeployStatus)> + '_ {
        self.schemas.iter().flat_map(|schema| {
            schema.object_types.iter().flat_map(move |object_type| {
                object_type.objects.iter().map(move |object| {
                    (
                        DeploymentUnit::new(&schema.name, &object_type.name, &object.name),
                        &object.status,
                    )
                })
            })
        })
    }

    pub fn status_of(&self, unit: &DeploymentUnit) -> Option<&DeployStatus> {
        self.schemas
            .iter()
            .find(|s| s.name == unit.schema)?
            .object_types
            .iter()
            .find(|t| t.name == unit.object_type)?
            .objects
            .iter()
            .find(|o| o.name == unit.name)
            .map(|o| &o.status)
    }

    pub fn pending_count(&self) -> usize {
        self.units().filter(|(_, status)| status.is_pending()).count()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    fn from_source(source: String) -> std::result::Result<Self, String> {
        let tree: Value = serde_yaml::from_str(&source).map_err(|e| e.to_string())?;
        let schemas = match &tree {
            Value::Null => Vec::new(),
            Value::Mapping(map) => map
                .iter()
                .map(|(k, v)| schema_entry(k, v))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => return Err("top level must be a mapping of schema names".to_string()),
        };

        let mut format = FormatContext {
            spans: index_leaves(&source),
            source,
            tree,
        };
        // Drop spans whose text disagrees with the parsed value; those leaves
        // fall back to a full re-render if they ever change.
        let verified: HashMap<LeafKey, LeafSpan> = format
            .spans
            .iter()
            .filter(|(key, span)| format.original_text(key).as_deref() == Some(span.text.as_str()))
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        format.spans = verified;

        Ok(Self { schemas, format })
    }

    fn render_tree(&self) -> Result<String> {
        let mut root = Mapping::new();
        for schema in &self.schemas {
            let mut types = Mapping::new();
            for object_type in &schema.object_types {
                let mut objects = Mapping::new();
                for object in &object_type.objects {
                    let key = (
                        schema.name.clone(),
                        object_type.name.clone(),
                        object.name.clone(),
                    );
                    let value = original_leaf(&self.format.tree, &key)
                        .filter(|v| leaf_text(v).ok().as_deref() == Some(object.status.as_str()))
                        .cloned()
                        .unwrap_or_else(|| Value::String(object.status.as_str().to_string()));
                    objects.insert(Value::String(object.name.clone()), value);
                }
                types.insert(Value::String(object_type.name.clone()), Value::Mapping(objects));
            }
            root.insert(Value::String(schema.name.clone()), Value::Mapping(types));
        }
        Ok(serde_yaml::to_string(&Value::Mapping(root))?)
    }
}

fn schema_entry(key: &Value, value: &Value) -> std::result::Result<SchemaEntry, String> {
    let name = key_text(key)?;
    let object_types = match value {
        Value::Null => Vec::new(),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| object_type_entry(&name, k, v))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        _ => return Err(format!("schema '{name}' must map object types to objects")),
    };
    Ok(SchemaEntry { name, object_types })
}

fn object_type_entry(
    schema: &str,
    key: &Value,
    value: &Value,
) -> std::result::Result<ObjectTypeEntry, String> {
    let name = key_text(key)?;
    let objects = match value {
        Value::Null => Vec::new(),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| -> std::result::Result<ObjectEntry, String> {
                let object = key_text(k)?;
                let status = leaf_text(v)
                    .map_err(|e| format!("{schema}/{name}/{object}: {e}"))?;
                Ok(ObjectEntry {
                    name: object,
                    status: DeployStatus::parse(&status),
                })
            })
            .collect::<std::result::Result<Vec<_>, String>>()?,
        _ => return Err(format!("'{schema}/{name}' must map object names to statuses")),
    };
    Ok(ObjectTypeEntry { name, objects })
}

fn key_text(key: &Value) -> std::result::Result<String, String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err("keys must be scalars".to_string()),
    }
}

fn leaf_text(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err("status must be a scalar".to_string()),
    }
}

fn child<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_mapping()?
        .iter()
        .find(|(k, _)| key_text(k).ok().as_deref() == Some(name))
        .map(|(_, v)| v)
}

fn original_leaf<'a>(tree: &'a Value, key: &LeafKey) -> Option<&'a Value> {
    child(child(child(tree, &key.0)?, &key.1)?, &key.2)
}

// ---------------------------------------------------------------------------
// Source indexing
// ---------------------------------------------------------------------------

static KEY_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn key_line_re() -> &'static Regex {
    KEY_LINE_RE.get_or_init(|| {
        Regex::new(
            r#"^(?P<indent> *)(?:"(?P<dq>(?:[^"\\]|\\.)*)"|'(?P<sq>(?:[^']|'')*)'|(?P<plain>[^\s#'"\-?:,\[\]{}&*!|>%@`](?:[^#:]*[^\s#:])?))[ \t]*:(?:[ \t]+(?P<rest>.*))?$"#,
        )
        .unwrap()
    })
}

/// Locate the value span of every three-level block-mapping leaf.
fn index_leaves(source: &str) -> HashMap<LeafKey, LeafSpan> {
    let mut spans = HashMap::new();
    let mut stack: Vec<(usize, String)> = Vec::new();

    for (line_no, raw) in source.split_inclusive('\n').enumerate() {
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');
        let Some(caps) = key_line_re().captures(line) else {
            continue;
        };

        let indent = caps.name("indent").map_or(0, |m| m.as_str().len());
        let key = if let Some(m) = caps.name("dq") {
            m.as_str().replace("\\\"", "\"").replace("\\\\", "\\")
        } else if let Some(m) = caps.name("sq") {
            m.as_str().replace("''", "'")
        } else if let Some(m) = caps.name("plain") {
            m.as_str().to_string()
        } else {
            continue;
        };

        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        stack.push((indent, key));

        if stack.len() != 3 {
            continue;
        }
        let Some(rest) = caps.name("rest") else {
            continue;
        };
        if let Some((start, end, quote, text)) = scan_value(rest.as_str()) {
            let key = (stack[0].1.clone(), stack[1].1.clone(), stack[2].1.clone());
            spans.insert(
                key,
                LeafSpan {
                    line: line_no,
                    start: rest.start() + start,
                    end: rest.start() + end,
                    quote,
                    text,
                },
            );
        }
    }

    spans
}

/// Find the scalar at the start of `rest`, returning its byte range, quote
/// style and unquoted text. Flow collections, block scalars, anchors, aliases
/// and tags are not indexed.
fn scan_value(rest: &str) -> Option<(usize, usize, QuoteStyle, String)> {
    let first = rest.chars().next()?;
    match first {
        '#' | '{' | '[' | '|' | '>' | '&' | '*' | '!' => None,
        '"' => {
            let mut escaped = false;
            for (i, c) in rest.char_indices().skip(1) {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => {
                        let text = rest[1..i].replace("\\\"", "\"").replace("\\\\", "\\");
                        return Some((0, i + 1, QuoteStyle::Double, text));
                    }
                    _ => {}
                }
            }
            None
        }
        '\'' => {
            let bytes = rest.as_bytes();
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    let text = rest[1..i].replace("''", "'");
                    return Some((0, i + 1, QuoteStyle::Single, text));
                }
                i += 1;
            }
            None
        }
        _ => {
            let end = rest.find(" #").or_else(|| rest.find("\t#")).unwrap_or(rest.len());
            let value = rest[..end].trim_end();
            if value.is_empty() {
                return None;
            }
            Some((0, value.len(), QuoteStyle::Plain, value.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
