/// Self-contained HTML report generator for decoded attack results.
///
/// Produces a single .html file with embedded CSS and no external
/// resources, so the report stays viewable offline. All extracted and
/// decoded text is escaped before it reaches the markup; captured traffic
/// is attacker-controlled and must not be able to break out of its block.
use std::fmt::Write as _;

use crate::decoder::{self, DecodedPayload, PayloadKind, ENCODING_ATTR};
use crate::dom::XmlNode;
use crate::extractor::ResultItem;

const TITLE: &str = "Burp Intruder Results (decoded)";

const STYLE: &str = "\
body{font-family:Segoe UI,Roboto,Arial;margin:18px;background:#f7f9fb;color:#111}
.container{max-width:1100px;margin:0 auto}
.entry{border:1px solid #ddd;background:#fff;padding:12px;margin:12px 0;border-radius:6px}
.hdr{display:flex;gap:12px;flex-wrap:wrap;margin-bottom:8px;font-size:13px}
.kv{font-weight:600;color:#333}
.pre{background:#0f1724;color:#e6fffa;padding:10px;border-radius:6px;overflow:auto;font-family:monospace;font-size:13px;white-space:pre}
.req{border-left:4px solid #0b6;padding-left:8px}
.resp{border-left:4px solid #06c;padding-left:8px}
.status{font-weight:700;color:#b91c1c}
.small{font-size:12px;color:#555}
.note{font-size:12px;color:#444;margin-top:6px}
.badge{display:inline-block;padding:2px 6px;border-radius:4px;background:#eee;font-size:12px;margin-left:6px}
";

const PLACEHOLDER: &str = "No <item> or recognizable request/response pairs found in XML.";

/// One rendering-ready report entry: 1-based index, header fields, and the
/// decoded request/response blocks that were present on the record.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub index: usize,
    pub position: Option<String>,
    pub status: Option<String>,
    pub length: Option<String>,
    pub host: Option<String>,
    pub request: Option<PayloadBlock>,
    pub response: Option<PayloadBlock>,
}

/// A decoded request or response body plus its provenance: how it decoded
/// and what encoding the source element declared, if any.
#[derive(Debug, Clone)]
pub struct PayloadBlock {
    pub text: String,
    pub kind: PayloadKind,
    pub encoding: Option<String>,
}

impl PayloadBlock {
    fn from_node(node: &XmlNode) -> Self {
        let DecodedPayload { text, kind } = decoder::extract_payload(node);
        Self {
            text,
            kind,
            encoding: node.attr(ENCODING_ATTR).map(str::to_string),
        }
    }
}

/// Decodes each extracted item into its rendering-ready form, indexed
/// 1-based in extraction order.
pub fn build_entries(items: &[ResultItem<'_>]) -> Vec<ReportEntry> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| ReportEntry {
            index: i + 1,
            position: item.position.clone(),
            status: item.status.clone(),
            length: item.length.clone(),
            host: item.host.clone(),
            request: item.request.map(PayloadBlock::from_node),
            response: item.response.map(PayloadBlock::from_node),
        })
        .collect()
}

/// Renders the full report document. An empty entry list produces a single
/// informational placeholder entry instead of an empty page.
pub fn render(entries: &[ReportEntry]) -> String {
    let mut body = String::new();
    if entries.is_empty() {
        push_tag(&mut body, "div", "entry", PLACEHOLDER);
    } else {
        for entry in entries {
            render_entry(&mut body, entry);
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{style}</style>
</head>
<body>
<div class="container">
{body}</div>
</body>
</html>
"#,
        title = TITLE,
        style = STYLE,
        body = body,
    )
}

fn render_entry(out: &mut String, entry: &ReportEntry) {
    out.push_str("<div class=\"entry\">\n<div class=\"hdr\">\n");
    push_tag(out, "div", "kv", &format!("Item #{}", entry.index));
    if let Some(ref position) = entry.position {
        push_tag(out, "div", "small", &format!("Position: {}", position));
    }
    if let Some(ref status) = entry.status {
        push_tag(out, "div", "status", &format!("Status: {}", status));
    }
    if let Some(ref length) = entry.length {
        push_tag(out, "div", "small", &format!("Length: {}", length));
    }
    out.push_str("</div>\n");

    render_block(out, "Request", "req", entry.request.as_ref());
    render_block(out, "Response", "resp", entry.response.as_ref());

    if let Some(ref host) = entry.host {
        push_tag(out, "div", "small", &format!("Host: {}", host));
    }
    out.push_str("</div>\n");
}

fn render_block(out: &mut String, title: &str, css_class: &str, block: Option<&PayloadBlock>) {
    let Some(block) = block else { return };

    let _ = write!(out, "<div class=\"{}\">\n<div class=\"kv\">{}", css_class, title);
    if block.kind != PayloadKind::Text {
        let _ = write!(out, "<span class=\"badge\">{}</span>", block.kind.as_str());
    }
    out.push_str("</div>\n");
    push_tag(out, "pre", "pre", &block.text);
    out.push_str("</div>\n");

    if let Some(ref encoding) = block.encoding {
        push_tag(
            out,
            "div",
            "note",
            &format!("Original node encoding attribute: {}", encoding),
        );
    }
}

/// Appends `<tag class="css_class">text</tag>` with the text escaped.
fn push_tag(out: &mut String, tag: &str, css_class: &str, text: &str) {
    let _ = writeln!(
        out,
        "<{tag} class=\"{class}\">{text}</{tag}>",
        tag = tag,
        class = css_class,
        text = html_escape(text),
    );
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
