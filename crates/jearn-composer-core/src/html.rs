//! HTML rendering of a document, used as the submitted post content.
//!
//! Atoms render as elements carrying a `data-type` attribute plus their
//! attributes, so the read side can hydrate them again.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::document::{Block, Document, Inline};
use crate::types::{ImageStatus, Mark};

/// Render the whole document.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    write_blocks(&mut out, doc.blocks());
    out
}

fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Paragraph { content } => {
                out.push_str("<p>");
                write_inlines(out, content);
                out.push_str("</p>");
            }
            Block::Heading { attrs, content } => {
                let _ = write!(out, "<h{}>", attrs.level);
                write_inlines(out, content);
                let _ = write!(out, "</h{}>", attrs.level);
            }
            Block::BulletList { content } => {
                out.push_str("<ul>");
                for item in content {
                    out.push_str("<li>");
                    write_blocks(out, &item.content);
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
            }
            Block::Blockquote { content } => {
                out.push_str("<blockquote>");
                write_blocks(out, content);
                out.push_str("</blockquote>");
            }
            Block::HorizontalRule => out.push_str("<hr>"),
            Block::LinkCard { attrs } => {
                let _ = write!(
                    out,
                    "<div data-type=\"link-card\" data-url=\"{}\" data-status=\"{}\"",
                    encode_double_quoted_attribute(&attrs.url),
                    match attrs.status {
                        crate::types::LinkCardStatus::Loading => "loading",
                        crate::types::LinkCardStatus::Ready => "ready",
                        crate::types::LinkCardStatus::Error => "error",
                    }
                );
                for (name, value) in [
                    ("data-title", &attrs.title),
                    ("data-description", &attrs.description),
                    ("data-image", &attrs.image),
                    ("data-site-name", &attrs.site_name),
                ] {
                    if let Some(value) = value {
                        let _ = write!(out, " {name}=\"{}\"", encode_double_quoted_attribute(value));
                    }
                }
                let _ = write!(
                    out,
                    "><a href=\"{}\">{}</a></div>",
                    encode_double_quoted_attribute(&attrs.url),
                    encode_text(attrs.label())
                );
            }
            Block::Embed { attrs } => {
                let _ = write!(
                    out,
                    "<div data-type=\"embed\" data-provider=\"{}\" data-src=\"{}\"></div>",
                    attrs.provider.as_str(),
                    encode_double_quoted_attribute(&attrs.normalized_url)
                );
            }
        }
    }
}

fn open_mark(out: &mut String, mark: &Mark) {
    match mark {
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Underline => out.push_str("<u>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Code => out.push_str("<code>"),
        Mark::Link { attrs } => {
            let _ = write!(
                out,
                "<a href=\"{}\">",
                encode_double_quoted_attribute(&attrs.href)
            );
        }
    }
}

fn close_mark(out: &mut String, mark: &Mark) {
    out.push_str(match mark {
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
        Mark::Link { .. } => "</a>",
    });
}

fn write_inlines(out: &mut String, content: &[Inline]) {
    for inline in content {
        match inline {
            Inline::Text { text, marks } => {
                marks.iter().for_each(|m| open_mark(out, m));
                out.push_str(&encode_text(text));
                marks.iter().rev().for_each(|m| close_mark(out, m));
            }
            Inline::HardBreak => out.push_str("<br>"),
            Inline::Mention { attrs } => {
                let _ = write!(
                    out,
                    "<span data-type=\"mention\" data-uid=\"{}\" data-handle=\"{}\">@{}</span>",
                    encode_double_quoted_attribute(&attrs.user_id),
                    encode_double_quoted_attribute(&attrs.display_handle),
                    encode_text(&attrs.display_handle)
                );
            }
            Inline::Tag { attrs } => {
                let _ = write!(
                    out,
                    "<span data-type=\"tag\" data-value=\"{}\">#{}</span>",
                    encode_double_quoted_attribute(&attrs.value),
                    encode_text(&attrs.value)
                );
            }
            Inline::Math { attrs } => {
                let _ = write!(
                    out,
                    "<span data-type=\"math\" data-latex=\"{}\"></span>",
                    encode_double_quoted_attribute(&attrs.source_latex)
                );
            }
            Inline::ImagePlaceholder { attrs } => {
                let src = match (&attrs.status, &attrs.remote_url) {
                    (ImageStatus::Uploaded, Some(url)) => url.as_str(),
                    _ => "",
                };
                let _ = write!(
                    out,
                    "<img src=\"{}\" data-local-id=\"{}\"",
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(attrs.local_id.as_str())
                );
                if let Some(w) = attrs.width {
                    let _ = write!(out, " width=\"{w}\"");
                }
                if let Some(h) = attrs.height {
                    let _ = write!(out, " height=\"{h}\"");
                }
                out.push('>');
            }
            Inline::InlineLink { attrs } => {
                let _ = write!(
                    out,
                    "<a href=\"{}\" data-type=\"inline-link\">{}</a>",
                    encode_double_quoted_attribute(&attrs.href),
                    encode_text(&attrs.display_text)
                );
            }
        }
    }
}
