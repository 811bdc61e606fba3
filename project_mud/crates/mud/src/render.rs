//! Text templates for mode descriptions and command output.
//!
//! Syntax:
//! - `{{path}}` inserts a value; `path` is a field name or dotted path.
//! - `{{#if path}}...{{else}}...{{/if}}` renders a branch on truthiness.
//! - `{{#each path}}...{{/each}}` repeats the body per array element; inside,
//!   `{{this}}` is the element and bare names resolve against it first.
//!
//! Rendering never fails from the caller's point of view: problems are logged
//! and the best available text is returned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read template {id}: {reason}")]
    Read { id: String, reason: String },

    #[error("unclosed '{{{{' in template")]
    Unclosed,

    #[error("unbalanced block tag: {0}")]
    Unbalanced(String),
}

const BUILTIN: &[(&str, &str)] = &[
    ("splash.txt", include_str!("../templates/splash.txt")),
    ("login_username.txt", include_str!("../templates/login_username.txt")),
    ("login_password.txt", include_str!("../templates/login_password.txt")),
    ("create_character.txt", include_str!("../templates/create_character.txt")),
    ("game.txt", include_str!("../templates/game.txt")),
    ("cmd_status.txt", include_str!("../templates/cmd_status.txt")),
    ("cmd_who.txt", include_str!("../templates/cmd_who.txt")),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
    If {
        path: String,
        then: Vec<Segment>,
        otherwise: Vec<Segment>,
    },
    Each {
        path: String,
        body: Vec<Segment>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Tag(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Stop {
    End,
    Else,
    CloseIf,
    CloseEach,
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        let mut tokens = tokenize(source)?.into_iter();
        let (segments, stop) = parse_block(&mut tokens)?;
        match stop {
            Stop::End => Ok(Self { segments }),
            Stop::Else => Err(RenderError::Unbalanced("else".into())),
            Stop::CloseIf => Err(RenderError::Unbalanced("/if".into())),
            Stop::CloseEach => Err(RenderError::Unbalanced("/each".into())),
        }
    }

    /// Render against `context`. Returns the text and any paths that did
    /// not resolve (rendered as empty).
    pub fn render(&self, context: &Value) -> (String, Vec<String>) {
        let mut out = String::new();
        let mut missing = Vec::new();
        render_segments(&self.segments, &mut vec![context], &mut out, &mut missing);
        (out, missing)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, RenderError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(RenderError::Unclosed)?;
        tokens.push(Token::Tag(after[..end].trim().to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

fn parse_block(
    tokens: &mut impl Iterator<Item = Token>,
) -> Result<(Vec<Segment>, Stop), RenderError> {
    let mut out = Vec::new();
    while let Some(token) = tokens.next() {
        let tag = match token {
            Token::Text(text) => {
                out.push(Segment::Text(text));
                continue;
            }
            Token::Tag(tag) => tag,
        };

        if let Some(path) = tag.strip_prefix("#if ") {
            let (then, stop) = parse_block(tokens)?;
            let otherwise = match stop {
                Stop::CloseIf => Vec::new(),
                Stop::Else => match parse_block(tokens)? {
                    (otherwise, Stop::CloseIf) => otherwise,
                    _ => return Err(RenderError::Unbalanced(format!("#if {path}"))),
                },
                _ => return Err(RenderError::Unbalanced(format!("#if {path}"))),
            };
            out.push(Segment::If {
                path: path.trim().to_string(),
                then,
                otherwise,
            });
        } else if let Some(path) = tag.strip_prefix("#each ") {
            let (body, stop) = parse_block(tokens)?;
            if stop != Stop::CloseEach {
                return Err(RenderError::Unbalanced(format!("#each {path}")));
            }
            out.push(Segment::Each {
                path: path.trim().to_string(),
                body,
            });
        } else {
            match tag.as_str() {
                "else" => return Ok((out, Stop::Else)),
                "/if" => return Ok((out, Stop::CloseIf)),
                "/each" => return Ok((out, Stop::CloseEach)),
                _ => out.push(Segment::Field(tag)),
            }
        }
    }
    Ok((out, Stop::End))
}

/// Resolve `path` against the innermost scope that has it.
fn lookup<'a>(path: &str, scopes: &[&'a Value]) -> Option<&'a Value> {
    if path == "this" {
        return scopes.last().copied();
    }
    scopes.iter().rev().find_map(|scope| {
        path.split('.')
            .try_fold(*scope, |value, key| value.get(key))
    })
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, out);
            }
        }
        other => out.push_str(&other.to_string()),
    }
}

fn render_segments<'a>(
    segments: &[Segment],
    scopes: &mut Vec<&'a Value>,
    out: &mut String,
    missing: &mut Vec<String>,
) {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Field(path) => match lookup(path, scopes) {
                Some(value) => write_value(value, out),
                None => missing.push(path.clone()),
            },
            Segment::If {
                path,
                then,
                otherwise,
            } => {
                let branch = if truthy(lookup(path, scopes)) {
                    then
                } else {
                    otherwise
                };
                render_segments(branch, scopes, out, missing);
            }
            Segment::Each { path, body } => match lookup(path, scopes) {
                Some(Value::Array(items)) => {
                    for item in items {
                        scopes.push(item);
                        render_segments(body, scopes, out, missing);
                        scopes.pop();
                    }
                }
                Some(_) => {}
                None => missing.push(path.clone()),
            },
        }
    }
}

/// Resolves template ids to text, caching parsed templates.
///
/// A template file in the override directory wins over the built-in copy.
#[derive(Debug, Default)]
pub struct Renderer {
    dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl Renderer {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::new(None)
    }

    /// Render `id` with `context`. On failure, logs and returns whatever
    /// could be produced (possibly empty).
    pub fn render<C: Serialize>(&self, id: &str, context: &C) -> String {
        let template = match self.template(id) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(template = id, "error loading template: {}", e);
                return String::new();
            }
        };
        let context = serde_json::to_value(context).unwrap_or_else(|e| {
            tracing::warn!(template = id, "error serializing template context: {}", e);
            Value::Null
        });
        let (text, missing) = template.render(&context);
        if !missing.is_empty() {
            tracing::warn!(template = id, fields = ?missing, "template referenced missing fields");
        }
        text
    }

    /// Cached template, loading and parsing it on first use.
    pub fn template(&self, id: &str) -> Result<Arc<Template>, RenderError> {
        if let Some(t) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(Arc::clone(t));
        }

        let parsed = Arc::new(Template::parse(&self.source(id)?)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(id.to_string()).or_insert(parsed)))
    }

    fn source(&self, id: &str) -> Result<String, RenderError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(id);
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|e| RenderError::Read {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        BUILTIN
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, src)| src.to_string())
            .ok_or_else(|| RenderError::NotFound(id.to_string()))
    }

    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
