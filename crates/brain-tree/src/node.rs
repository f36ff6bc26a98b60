//! Documents and tree nodes.
//!
//! A document is a markdown file that starts with a YAML front matter
//! block:
//!
//! ```text
//! ---
//! title: Networking
//! tags: [linux, tcp]
//! ---
//! # Body
//! ```
//!
//! `title` is required and must be a non-empty string. `tags` is optional.

use crate::path::{base_name, DOCUMENT_SUFFIX};
use crate::TreeError;
use pulldown_cmark::{html, Options, Parser};
use serde_yaml::Value;

const FRONT_MATTER_DELIMITER: &str = "---";

/// A parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Title from the front matter
    pub title: String,
    /// Tags in declaration order, trimmed
    pub tags: Vec<String>,
    /// Unmodified source bytes
    pub raw: Vec<u8>,
    /// HTML rendering of the body
    pub rendered: String,
}

impl Document {
    /// Parse and validate a document from its source bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, TreeError> {
        let (front_matter, body) = split_front_matter(raw)?;

        let metadata = match front_matter {
            Some(block) => {
                let yaml = std::str::from_utf8(block).map_err(|_| {
                    TreeError::InvalidDocument("front matter must be valid UTF-8".into())
                })?;
                serde_yaml::from_str::<Value>(yaml).map_err(|e| {
                    TreeError::InvalidDocument(format!("malformed front matter: {}", e))
                })?
            }
            None => Value::Null,
        };

        let title = match metadata.get("title") {
            None => {
                return Err(TreeError::InvalidDocument(
                    "brain node must contain title front matter".into(),
                ))
            }
            Some(Value::String(title)) if title.is_empty() => {
                return Err(TreeError::InvalidDocument(
                    "brain node title front matter must not be empty".into(),
                ))
            }
            Some(Value::String(title)) => title.clone(),
            Some(_) => {
                return Err(TreeError::InvalidDocument(
                    "brain node title front matter must be a string".into(),
                ))
            }
        };

        let tags = match metadata.get("tags") {
            Some(Value::Sequence(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(|tag| tag.trim().to_string())
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            title,
            tags,
            raw: raw.to_vec(),
            rendered: render_markdown(&String::from_utf8_lossy(body)),
        })
    }
}

/// Split a leading `---` delimited block from the body.
///
/// Works on bytes: only the front matter has to be text.
fn split_front_matter(raw: &[u8]) -> Result<(Option<&[u8]>, &[u8]), TreeError> {
    let Some(first_end) = raw.iter().position(|&b| b == b'\n') else {
        return Ok((None, raw));
    };
    if !is_delimiter(&raw[..first_end]) {
        return Ok((None, raw));
    }

    let block_start = first_end + 1;
    let mut offset = block_start;
    for line in raw[block_start..].split_inclusive(|&b| b == b'\n') {
        if is_delimiter(line) {
            let front_matter = &raw[block_start..offset];
            let body = &raw[offset + line.len()..];
            return Ok((Some(front_matter), body));
        }
        offset += line.len();
    }

    Err(TreeError::InvalidDocument(
        "front matter block is not terminated".into(),
    ))
}

fn is_delimiter(line: &[u8]) -> bool {
    line.trim_ascii_end() == FRONT_MATTER_DELIMITER.as_bytes()
}

fn render_markdown(body: &str) -> String {
    let parser = Parser::new_ext(body, Options::ENABLE_SMART_PUNCTUATION);
    let mut rendered = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}

/// Kind of tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A document file
    File(Document),
    /// A directory with its entries in enumeration order
    Directory { title: String, children: Vec<Node> },
}

/// A node in the content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Slash-separated path relative to the content root
    pub path: String,
    pub kind: NodeKind,
}

impl Node {
    /// Create a file node.
    pub fn file(path: impl Into<String>, document: Document) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::File(document),
        }
    }

    /// Create a directory node. The title is the entry name without the
    /// document suffix.
    pub fn directory(path: impl Into<String>, children: Vec<Node>) -> Self {
        let path = path.into();
        let name = base_name(&path);
        let title = name.strip_suffix(DOCUMENT_SUFFIX).unwrap_or(name).to_string();
        Self {
            path,
            kind: NodeKind::Directory { title, children },
        }
    }

    /// Last path segment, including the suffix for files.
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }

    /// Display title.
    pub fn title(&self) -> &str {
        match &self.kind {
            NodeKind::File(document) => &document.title,
            NodeKind::Directory { title, .. } => title,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Child nodes, empty for files.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Directory { children, .. } => children,
            NodeKind::File(_) => &[],
        }
    }

    /// The parsed document, `None` for directories.
    pub fn document(&self) -> Option<&Document> {
        match &self.kind {
            NodeKind::File(document) => Some(document),
            NodeKind::Directory { .. } => None,
        }
    }

    pub(crate) fn matches_exact(&self, segment: &str) -> bool {
        self.name() == segment
    }

    /// Files also answer to their name without the document suffix.
    pub(crate) fn matches_logical(&self, segment: &str) -> bool {
        !self.is_dir() && self.name().strip_suffix(DOCUMENT_SUFFIX) == Some(segment)
    }
}
