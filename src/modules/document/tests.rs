use crate::modules::document::builder::build_document;
use crate::modules::document::{AdfNode, Mark};
use ahash::AHashMap;

fn no_map() -> AHashMap<String, String> {
    AHashMap::new()
}

#[test]
fn empty_html_yields_single_empty_paragraph() {
    for html in ["", "   ", "<html><body></body></html>"] {
        let doc = build_document(html, &no_map());
        assert_eq!(doc.content.len(), 1, "input: {:?}", html);
        assert_eq!(
            doc.content[0],
            AdfNode::Paragraph {
                content: Vec::new()
            }
        );
    }
}

#[test]
fn paragraphs_and_headings_map_to_blocks() {
    let doc = build_document("<h2>Title</h2><p>Body text</p>", &no_map());
    match &doc.content[0] {
        AdfNode::Heading { attrs, content } => {
            assert_eq!(attrs.level, 2);
            assert_eq!(content[0], AdfNode::text("Title"));
        }
        other => panic!("expected heading, got {:?}", other),
    }
    match &doc.content[1] {
        AdfNode::Paragraph { content } => assert_eq!(content[0], AdfNode::text("Body text")),
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn nested_marks_accumulate_on_text_leaves() {
    let doc = build_document("<p><strong><em>x</em></strong></p>", &no_map());
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected paragraph");
    };
    let AdfNode::Text { text, marks } = &content[0] else {
        panic!("expected text node");
    };
    assert_eq!(text, "x");
    let marks = marks.as_ref().unwrap();
    assert!(marks.contains(&Mark::Strong));
    assert!(marks.contains(&Mark::Em));
    assert_eq!(marks.len(), 2);
}

#[test]
fn line_breaks_become_hard_break_nodes() {
    let doc = build_document("<p>Line1<br>Line2</p>", &no_map());
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(content[0], AdfNode::text("Line1"));
    assert_eq!(content[1], AdfNode::HardBreak);
    assert_eq!(content[2], AdfNode::text("Line2"));
}

#[test]
fn span_styles_map_to_marks() {
    let html = "<p>\
        <span style='font-weight:bold'>B</span>\
        <span style='font-style:italic'>I</span>\
        <span style='text-decoration:underline'>U</span>\
        </p>";
    let doc = build_document(html, &no_map());
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected paragraph");
    };
    let marks_of = |node: &AdfNode| -> Vec<Mark> {
        match node {
            AdfNode::Text { marks, .. } => marks.clone().unwrap_or_default(),
            other => panic!("expected text node, got {:?}", other),
        }
    };
    assert!(marks_of(&content[0]).contains(&Mark::Strong));
    assert!(marks_of(&content[1]).contains(&Mark::Em));
    assert!(marks_of(&content[2]).contains(&Mark::Underline));
}

#[test]
fn links_carry_their_href() {
    let doc = build_document("<p><a href='https://example.com'>site</a></p>", &no_map());
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected paragraph");
    };
    let AdfNode::Text { marks, .. } = &content[0] else {
        panic!("expected text node");
    };
    let marks = marks.as_ref().unwrap();
    assert!(matches!(
        &marks[0],
        Mark::Link { attrs } if attrs.href == "https://example.com"
    ));
}

#[test]
fn lists_nest_list_items_with_block_content() {
    let doc = build_document("<ul><li>one</li><li>two</li></ul><ol><li>1</li></ol>", &no_map());
    let AdfNode::BulletList { content } = &doc.content[0] else {
        panic!("expected bulletList");
    };
    assert_eq!(content.len(), 2);
    let AdfNode::ListItem { content: item } = &content[0] else {
        panic!("expected listItem");
    };
    assert_eq!(item[0], AdfNode::paragraph_text("one"));
    assert!(matches!(&doc.content[1], AdfNode::OrderedList { content } if content.len() == 1));
}

#[test]
fn blockquotes_convert_recursively() {
    let doc = build_document("<blockquote><p>quoted</p></blockquote>", &no_map());
    let AdfNode::Blockquote { content } = &doc.content[0] else {
        panic!("expected blockquote");
    };
    assert_eq!(content[0], AdfNode::paragraph_text("quoted"));
}

#[test]
fn unknown_elements_fall_back_to_paragraphs() {
    let doc = build_document("<div><b>kept</b></div>", &no_map());
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected fallback paragraph");
    };
    let AdfNode::Text { text, marks } = &content[0] else {
        panic!("expected text node");
    };
    assert_eq!(text, "kept");
    assert!(marks.as_ref().unwrap().contains(&Mark::Strong));
}

#[test]
fn placeholder_images_resolve_through_inline_map() {
    let mut map = AHashMap::new();
    map.insert("abc".to_string(), "photo.png".to_string());
    let doc = build_document(
        "<html><body><img src='__INLINE_IMAGE__[abc]__'></body></html>",
        &map,
    );
    let AdfNode::MediaSingle { content } = &doc.content[0] else {
        panic!("expected mediaSingle, got {:?}", doc.content[0]);
    };
    let AdfNode::Media { attrs } = &content[0] else {
        panic!("expected media child");
    };
    assert_eq!(attrs.id, "photo.png");
}

#[test]
fn unmapped_placeholders_fall_back_to_the_content_id() {
    let doc = build_document(
        "<html><body><img src='__INLINE_IMAGE__[xyz]__'></body></html>",
        &no_map(),
    );
    let AdfNode::MediaSingle { content } = &doc.content[0] else {
        panic!("expected mediaSingle");
    };
    assert!(matches!(&content[0], AdfNode::Media { attrs } if attrs.id == "xyz"));
}

#[test]
fn placeholders_in_text_are_replaced_with_readable_labels() {
    let mut map = AHashMap::new();
    map.insert("abc".to_string(), "photo.png".to_string());
    let doc = build_document("<p>see __INLINE_IMAGE__[abc]__ here</p>", &map);
    let AdfNode::Paragraph { content } = &doc.content[0] else {
        panic!("expected paragraph");
    };
    let AdfNode::Text { text, .. } = &content[0] else {
        panic!("expected text node");
    };
    assert_eq!(text, "see [inline image: photo.png] here");
}

#[test]
fn non_placeholder_images_produce_nothing() {
    let doc = build_document("<p>before</p><img src='https://example.com/x.png'>", &no_map());
    assert_eq!(doc.content.len(), 1);
}

#[test]
fn prepend_note_is_pure_and_leads_the_document() {
    let doc = build_document("<p>existing</p>", &no_map());
    let annotated = doc.prepend_note("read me first");
    assert_eq!(doc.content.len(), 1);
    assert_eq!(annotated.content.len(), 2);
    assert_eq!(annotated.content[0], AdfNode::paragraph_text("read me first"));
    assert_eq!(annotated.content[1], doc.content[0]);
}

#[test]
fn serialized_shape_matches_adf() {
    let doc = build_document("<h1>T</h1>", &no_map());
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["type"], "doc");
    assert_eq!(value["version"], 1);
    assert_eq!(value["content"][0]["type"], "heading");
    assert_eq!(value["content"][0]["attrs"]["level"], 1);
    assert_eq!(value["content"][0]["content"][0]["type"], "text");
}

#[test]
fn empty_paragraph_serializes_without_content_field() {
    let doc = build_document("", &no_map());
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["content"][0], serde_json::json!({"type": "paragraph"}));
}
