//! Rich-text document model produced by the external editor surface.
//!
//! A document is a tree of typed nodes. The editor owns construction and
//! mutation; this crate only ever walks immutable snapshots. Unknown node and
//! mark types must survive deserialization so that documents written by a
//! newer editor still render (renderers recurse into their children or skip
//! them, they never error).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node discriminator. `Unknown` absorbs any type string this version does
/// not recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Heading,
    Paragraph,
    Text,
    BulletList,
    OrderedList,
    ListItem,
    Image,
    Blockquote,
    HorizontalRule,
    HardBreak,
    Table,
    TableRow,
    TableCell,
    #[serde(other)]
    Unknown,
}

/// Inline formatting mark attached to a text node. Marks apply left to right,
/// each wrapping what came before, so the first mark in the array ends up
/// innermost in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl Mark {
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<DocumentNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl DocumentNode {
    /// An empty `doc` root, the smallest valid document.
    pub fn empty_doc() -> Self {
        Self {
            kind: NodeKind::Doc,
            attrs: None,
            content: Some(Vec::new()),
            text: None,
            marks: None,
        }
    }

    /// Child nodes, or an empty slice for leaves and malformed nodes.
    pub fn children(&self) -> &[DocumentNode] {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn marks(&self) -> &[Mark] {
        self.marks.as_deref().unwrap_or_default()
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.as_ref()?.get(name)?.as_u64()
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attrs.as_ref()?.get(name)?.as_bool()
    }
}
