/// Brace-slot text templates used by every text-producing content table.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Named slot filled at render time: `{name}`.
    Slot(String),
}

/// A parsed template. Serialized as its source text, so content files
/// hold plain strings and a malformed template fails at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{slot}` → `Slot`
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' => {
                    if i + 1 < len && chars[i + 1] == '{' {
                        literal_buf.push('{');
                        i += 2;
                        continue;
                    }

                    if !literal_buf.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(
                            &mut literal_buf,
                        )));
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(TemplateError::Parse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(TemplateError::Parse("unclosed brace".to_string()));
                    }

                    let name: String = chars[start..end].iter().collect();
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::Parse("empty braces".to_string()));
                    }
                    segments.push(TemplateSegment::Slot(name.to_string()));
                    i = end + 1;
                }
                '}' => {
                    if i + 1 < len && chars[i + 1] == '}' {
                        literal_buf.push('}');
                        i += 2;
                        continue;
                    }
                    return Err(TemplateError::Parse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template {
            source: input.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Names of all slots referenced by this template, in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Slot(name) => Some(name.as_str()),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Render with a resolver. Unresolved slots render as their name.
    pub fn render_with<F>(&self, mut resolve: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Slot(name) => match resolve(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        tracing::trace!(slot = %name, "unresolved template slot");
                        out.push_str(name);
                    }
                },
            }
        }
        out
    }

    /// Render from a list of `(slot, value)` pairs.
    pub fn render(&self, slots: &[(&str, &str)]) -> String {
        self.render_with(|name| {
            slots
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Template::parse(&s)
    }
}

impl From<Template> for String {
    fn from(t: Template) -> Self {
        t.source
    }
}
