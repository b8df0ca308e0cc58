// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::document::{AdfDocument, AdfNode, HeadingAttrs, LinkAttrs, Mark, MediaAttrs};
use ahash::AHashMap;
use regex::Regex;
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

/// Marker the normalizer substitutes for `cid:` references so the builder
/// and the renderer can resolve inline images positionally.
pub static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__INLINE_IMAGE__\[([^\]]+)\]__").unwrap());

/// Converts an HTML fragment into a structured document.
///
/// Top-level children of the body are mapped to block nodes; anything
/// unrecognized falls back to a paragraph of its inline content, so input
/// is never dropped wholesale. Empty input yields one empty paragraph.
pub fn build_document(html: &str, inline_map: &AHashMap<String, String>) -> AdfDocument {
    let parsed = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    let mut content = Vec::new();
    if let Some(body) = parsed.select(&body_selector).next() {
        for child in body.children() {
            content.extend(convert_node(child, inline_map));
        }
    }
    AdfDocument::new(content)
}

fn convert_node(node: NodeRef<Node>, inline_map: &AHashMap<String, String>) -> Vec<AdfNode> {
    match node.value() {
        Node::Text(text) => {
            let replaced = replace_placeholders(&text.text, inline_map);
            let trimmed = replaced.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![AdfNode::paragraph_text(trimmed)]
            }
        }
        Node::Element(_) => match ElementRef::wrap(node) {
            Some(element) => convert_element(element, inline_map),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn convert_element(element: ElementRef, inline_map: &AHashMap<String, String>) -> Vec<AdfNode> {
    match element.value().name() {
        "p" => vec![AdfNode::Paragraph {
            content: inline_content(element, inline_map),
        }],
        name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            let level = name[1..].parse::<u8>().unwrap_or(1);
            vec![AdfNode::Heading {
                attrs: HeadingAttrs { level },
                content: inline_content(element, inline_map),
            }]
        }
        name @ ("ul" | "ol") => {
            let items = element
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "li")
                .map(|li| AdfNode::ListItem {
                    content: block_children(li, inline_map),
                })
                .collect();
            if name == "ul" {
                vec![AdfNode::BulletList { content: items }]
            } else {
                vec![AdfNode::OrderedList { content: items }]
            }
        }
        "blockquote" => vec![AdfNode::Blockquote {
            content: block_children(element, inline_map),
        }],
        "img" => convert_image(element, inline_map),
        _ => vec![AdfNode::Paragraph {
            content: convert_inline_element(element, &[], inline_map),
        }],
    }
}

/// Recursively converts an element's children as block content, e.g. for
/// blockquotes and list items. An empty result still yields one paragraph
/// so containers are never empty.
fn block_children(element: ElementRef, inline_map: &AHashMap<String, String>) -> Vec<AdfNode> {
    let mut blocks = Vec::new();
    for child in element.children() {
        blocks.extend(convert_node(child, inline_map));
    }
    if blocks.is_empty() {
        blocks.push(AdfNode::Paragraph {
            content: Vec::new(),
        });
    }
    blocks
}

fn convert_image(element: ElementRef, inline_map: &AHashMap<String, String>) -> Vec<AdfNode> {
    let src = element.value().attr("src").unwrap_or("");
    match PLACEHOLDER_RE.captures(src) {
        Some(caps) => {
            let cid = &caps[1];
            let name = inline_map
                .get(cid)
                .cloned()
                .unwrap_or_else(|| cid.to_string());
            vec![AdfNode::MediaSingle {
                content: vec![AdfNode::Media {
                    attrs: MediaAttrs {
                        id: name,
                        media_type: "file".to_string(),
                        collection: String::new(),
                    },
                }],
            }]
        }
        None => Vec::new(),
    }
}

fn inline_content(element: ElementRef, inline_map: &AHashMap<String, String>) -> Vec<AdfNode> {
    convert_inline_element(element, &[], inline_map)
}

/// Descends through inline markup accumulating marks; each text leaf carries
/// the marks of the tags enclosing it. `<br>` becomes an explicit hardBreak.
fn convert_inline_element(
    element: ElementRef,
    marks: &[Mark],
    inline_map: &AHashMap<String, String>,
) -> Vec<AdfNode> {
    let name = element.value().name();
    if name == "br" {
        return vec![AdfNode::HardBreak];
    }

    let mut active = marks.to_vec();
    match name {
        "strong" | "b" => push_mark(&mut active, Mark::Strong),
        "em" | "i" => push_mark(&mut active, Mark::Em),
        "u" => push_mark(&mut active, Mark::Underline),
        "span" => {
            for mark in style_marks(element.value().attr("style").unwrap_or("")) {
                push_mark(&mut active, mark);
            }
        }
        "a" => {
            if let Some(href) = element.value().attr("href") {
                active.push(Mark::Link {
                    attrs: LinkAttrs {
                        href: href.to_string(),
                    },
                });
            }
        }
        _ => {}
    }

    let mut nodes = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let replaced = replace_placeholders(&text.text, inline_map);
                if !replaced.trim().is_empty() {
                    nodes.push(AdfNode::text_with_marks(replaced, active.clone()));
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    nodes.extend(convert_inline_element(child_element, &active, inline_map));
                }
            }
            _ => {}
        }
    }
    nodes
}

fn push_mark(marks: &mut Vec<Mark>, mark: Mark) {
    if !marks.contains(&mark) {
        marks.push(mark);
    }
}

/// Inline CSS shorthand some mail clients emit instead of semantic tags.
fn style_marks(style: &str) -> Vec<Mark> {
    let mut marks = Vec::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        match property.as_str() {
            "font-weight" if value == "bold" || value == "700" => marks.push(Mark::Strong),
            "font-style" if value == "italic" => marks.push(Mark::Em),
            "text-decoration" if value.contains("underline") => marks.push(Mark::Underline),
            _ => {}
        }
    }
    marks
}

fn replace_placeholders(text: &str, inline_map: &AHashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures| {
            let cid = &caps[1];
            let name = inline_map.get(cid).map(|n| n.as_str()).unwrap_or(cid);
            format!("[inline image: {}]", name)
        })
        .into_owned()
}
