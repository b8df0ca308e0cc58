// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

pub mod builder;
#[cfg(test)]
mod tests;

/// Atlassian Document Format tree used as the ticket description.
///
/// The node set is deliberately closed: everything the pipeline produces is
/// one of these variants, and consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub version: u32,
    pub content: Vec<AdfNode>,
}

impl AdfDocument {
    /// A document always carries at least one block node; empty input
    /// yields a single empty paragraph.
    pub fn new(content: Vec<AdfNode>) -> Self {
        let content = if content.is_empty() {
            vec![AdfNode::Paragraph {
                content: Vec::new(),
            }]
        } else {
            content
        };
        Self {
            doc_type: "doc".to_string(),
            version: 1,
            content,
        }
    }

    /// Returns a new document with a plain paragraph containing `note`
    /// inserted ahead of all existing content.
    pub fn prepend_note(&self, note: &str) -> AdfDocument {
        let mut content = Vec::with_capacity(self.content.len() + 1);
        content.push(AdfNode::paragraph_text(note));
        content.extend(self.content.iter().cloned());
        AdfDocument::new(content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdfNode {
    Paragraph {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<AdfNode>,
    },
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<AdfNode>,
    },
    BulletList {
        content: Vec<AdfNode>,
    },
    OrderedList {
        content: Vec<AdfNode>,
    },
    ListItem {
        content: Vec<AdfNode>,
    },
    Blockquote {
        content: Vec<AdfNode>,
    },
    MediaSingle {
        content: Vec<AdfNode>,
    },
    Media {
        attrs: MediaAttrs,
    },
    HardBreak,
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marks: Option<Vec<Mark>>,
    },
}

impl AdfNode {
    pub fn text(text: impl Into<String>) -> AdfNode {
        AdfNode::Text {
            text: text.into(),
            marks: None,
        }
    }

    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> AdfNode {
        AdfNode::Text {
            text: text.into(),
            marks: if marks.is_empty() { None } else { Some(marks) },
        }
    }

    pub fn paragraph_text(text: impl Into<String>) -> AdfNode {
        AdfNode::Paragraph {
            content: vec![AdfNode::text(text)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttrs {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Strong,
    Em,
    Underline,
    Link { attrs: LinkAttrs },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
}
