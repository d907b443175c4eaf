//! Canonical JSON form of a [`Document`].
//!
//! Every node is tagged with `type` and keeps its attributes under `attrs`:
//!
//! ```json
//! {"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"hi"}]}]}
//! ```

use crate::document::Document;
use crate::error::{DocumentError, ParseError};

/// Serialize a document to its canonical JSON string.
pub fn serialize(doc: &Document) -> Result<String, DocumentError> {
    serde_json::to_string(doc).map_err(|e| DocumentError::Serialize(e.to_string()))
}

/// Serialize a document to a JSON value, for embedding in larger records.
pub fn to_value(doc: &Document) -> Result<serde_json::Value, DocumentError> {
    serde_json::to_value(doc).map_err(|e| DocumentError::Serialize(e.to_string()))
}

/// Parse the canonical JSON form. Failures carry the offending location.
pub fn parse(src: &str) -> Result<Document, DocumentError> {
    serde_json::from_str(src).map_err(|e| DocumentError::Parse(ParseError::from_json(e, src)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Inline, ListItem};
    use crate::types::{
        EmbedAttrs, EmbedProvider, ImageAttrs, ImageStatus, LinkCardAttrs, LinkCardStatus,
        LocalImageId, Mark,
    };
    use pretty_assertions::assert_eq;

    fn every_kind() -> Document {
        let mut uploaded = ImageAttrs::local(LocalImageId::new("img-2"));
        uploaded.status = ImageStatus::Uploaded;
        uploaded.remote_url = Some("https://cdn.example.com/2.png".into());
        uploaded.width = Some(640);

        let mut card = LinkCardAttrs::loading("https://example.com/a");
        card.status = LinkCardStatus::Ready;
        card.title = Some("A".into());
        card.site_name = Some("Example".into());

        Document::from_blocks(vec![
            Block::heading(2, vec![Inline::text("Title")]),
            Block::paragraph(vec![
                Inline::marked("bold link", vec![Mark::Bold, Mark::link("https://x.io")]),
                Inline::HardBreak,
                Inline::mention("0123456789abcdef01234567", "ann"),
                Inline::tag("rust"),
                Inline::math("x^2"),
                Inline::image(ImageAttrs::local(LocalImageId::new("img-1"))),
                Inline::image(uploaded),
                Inline::inline_link("https://jearn.site/posts/0123456789abcdef01234567", "see"),
            ]),
            Block::BulletList {
                content: vec![ListItem::new(vec![Block::paragraph(vec![Inline::marked(
                    "item",
                    vec![Mark::Italic, Mark::Underline, Mark::Strike, Mark::Code],
                )])])],
            },
            Block::Blockquote {
                content: vec![Block::empty_paragraph()],
            },
            Block::HorizontalRule,
            Block::link_card(card),
            Block::link_card(LinkCardAttrs::loading("https://example.com/b")),
            Block::embed(EmbedAttrs {
                normalized_url: "https://www.youtube.com/embed/abc123".into(),
                provider: EmbedProvider::YouTube,
            }),
        ])
    }

    #[test]
    fn test_round_trip_every_node_kind() {
        let doc = every_kind();
        let json = serialize(&doc).unwrap();
        let parsed = parse(&json).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(serialize(&parsed).unwrap(), json);
    }

    #[test]
    fn test_snapshot_small_document() {
        let doc = Document::from_blocks(vec![
            Block::paragraph(vec![Inline::text("hi "), Inline::tag("news")]),
            Block::link_card(LinkCardAttrs::loading("https://example.com/article")),
            Block::empty_paragraph(),
        ]);
        insta::assert_json_snapshot!(to_value(&doc).unwrap(), @r###"
        {
          "content": [
            {
              "content": [
                {
                  "text": "hi ",
                  "type": "text"
                },
                {
                  "attrs": {
                    "value": "news"
                  },
                  "type": "tag"
                }
              ],
              "type": "paragraph"
            },
            {
              "attrs": {
                "status": "loading",
                "url": "https://example.com/article"
              },
              "type": "linkCard"
            },
            {
              "type": "paragraph"
            }
          ],
          "type": "doc"
        }
        "###);
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = parse("{\"type\":\"doc\",\n \"content\": [ {\"type\": \"nope\"} ]}").unwrap_err();
        match err {
            DocumentError::Parse(parse) => {
                assert_eq!(parse.line, 2);
                assert_eq!(parse.column, 24);
                assert!(parse.message().contains("nope"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_keeps_reader_location() {
        let err = parse("{\"type\":\"doc\",\n\n \"content\": [,]}").unwrap_err();
        let DocumentError::Parse(parse) = err else {
            panic!("expected a parse error");
        };
        assert_eq!(parse.line, 3);
    }

    #[test]
    fn test_duplicate_image_ids_are_rejected() {
        let image = r#"{"type":"imagePlaceholder","attrs":{"localId":"img-1","status":"local"}}"#;
        let src = format!(
            r#"{{"type":"doc","content":[{{"type":"paragraph","content":[{image},{image}]}}]}}"#
        );
        let err = parse(&src).unwrap_err();
        let DocumentError::Parse(parse) = err else {
            panic!("expected a parse error");
        };
        assert!(parse.message().contains("img-1"));
    }

    #[test]
    fn test_empty_doc_content_parses_to_new_document() {
        let doc = parse(r#"{"type":"doc","content":[]}"#).unwrap();
        assert_eq!(doc, Document::new());
    }
}
