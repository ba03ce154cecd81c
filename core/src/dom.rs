/// Minimal XML document tree on top of the quick-xml event reader.
///
/// quick-xml deliberately ships no DOM; the extraction strategies need
/// descendant searches and subtree text concatenation, so this module
/// assembles just enough of a tree from the event stream. Child elements and
/// literal text segments stay interleaved in document order, which keeps
/// subtree text faithful to the source markup, CDATA included.
use anyhow::{bail, Context};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One element in the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub content: Vec<XmlContent>,
}

/// Ordered element content: child elements interleaved with text segments.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlContent {
    Element(XmlNode),
    Text(String),
}

impl XmlNode {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            content: Vec::new(),
        }
    }

    /// First attribute with this exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenation of every literal text segment in the subtree, in
    /// document order. Entity references come back unescaped, CDATA
    /// sections contribute their content verbatim.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for part in &self.content {
            match part {
                XmlContent::Text(text) => out.push_str(text),
                XmlContent::Element(child) => child.collect_text(out),
            }
        }
    }

    /// Direct child elements, in document order.
    pub fn children(&self) -> impl Iterator<Item = &XmlNode> {
        self.content.iter().filter_map(|part| match part {
            XmlContent::Element(node) => Some(node),
            XmlContent::Text(_) => None,
        })
    }

    /// Every descendant element with this exact name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in self.children() {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// First descendant element with this exact name, in document order.
    pub fn find_first(&self, name: &str) -> Option<&XmlNode> {
        for child in self.children() {
            if child.name == name {
                return Some(child);
            }
            if let Some(hit) = child.find_first(name) {
                return Some(hit);
            }
        }
        None
    }
}

/// Parses a whole XML document into a tree.
///
/// The returned node is a synthetic unnamed root holding the top-level
/// elements, so descendant searches cover the whole document. Malformed
/// markup is fatal; the reader's own error surfaces.
pub fn parse(input: &str) -> anyhow::Result<XmlNode> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().check_end_names = true;
    let mut stack: Vec<XmlNode> = vec![XmlNode::new(String::new(), Vec::new())];

    loop {
        match reader.read_event().context("XML parse error")? {
            Event::Start(start) => {
                stack.push(XmlNode::new(element_name(&start), read_attributes(&start)?));
            }
            Event::Empty(start) => {
                let node = XmlNode::new(element_name(&start), read_attributes(&start)?);
                attach(&mut stack, XmlContent::Element(node));
            }
            Event::End(end) => match (stack.pop(), stack.last_mut()) {
                (Some(node), Some(parent)) if !node.name.is_empty() => {
                    parent.content.push(XmlContent::Element(node));
                }
                _ => bail!(
                    "unexpected closing tag </{}>",
                    String::from_utf8_lossy(end.name().as_ref())
                ),
            },
            Event::Text(text) => {
                let text = text.unescape().context("XML parse error")?.into_owned();
                attach(&mut stack, XmlContent::Text(text));
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                attach(&mut stack, XmlContent::Text(text));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no report content.
            _ => {}
        }
    }

    if stack.len() != 1 {
        bail!(
            "unclosed element <{}>",
            stack.last().map(|node| node.name.as_str()).unwrap_or("")
        );
    }
    Ok(stack.remove(0))
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn read_attributes(start: &BytesStart) -> anyhow::Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.context("malformed XML attribute")?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .context("malformed XML attribute value")?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn attach(stack: &mut [XmlNode], content: XmlContent) {
    if let XmlContent::Text(text) = &content {
        if text.is_empty() {
            return;
        }
    }
    if let Some(top) = stack.last_mut() {
        top.content.push(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_document() {
        let doc = parse("<items><item><status>200</status></item></items>").unwrap();
        let status = doc.find_first("status").unwrap();
        assert_eq!(status.text(), "200");
    }

    #[test]
    fn test_attributes_are_read() {
        let doc = parse(r#"<request encoding="base64" method="GET">aGk=</request>"#).unwrap();
        let request = doc.find_first("request").unwrap();
        assert_eq!(request.attr("encoding"), Some("base64"));
        assert_eq!(request.attr("method"), Some("GET"));
        assert_eq!(request.attr("missing"), None);
    }

    #[test]
    fn test_self_closing_element() {
        let doc = parse(r#"<item><request encoding="base64"/></item>"#).unwrap();
        let request = doc.find_first("request").unwrap();
        assert_eq!(request.attr("encoding"), Some("base64"));
        assert_eq!(request.text(), "");
    }

    #[test]
    fn test_text_unescapes_entities() {
        let doc = parse("<response>a &amp; b &lt;c&gt;</response>").unwrap();
        assert_eq!(doc.find_first("response").unwrap().text(), "a & b <c>");
    }

    #[test]
    fn test_cdata_is_literal() {
        let doc = parse("<request><![CDATA[GET /?q=<script> HTTP/1.1]]></request>").unwrap();
        assert_eq!(
            doc.find_first("request").unwrap().text(),
            "GET /?q=<script> HTTP/1.1"
        );
    }

    #[test]
    fn test_subtree_text_keeps_document_order() {
        let doc = parse("<r>abc<b>def</b>ghi</r>").unwrap();
        assert_eq!(doc.find_first("r").unwrap().text(), "abcdefghi");
    }

    #[test]
    fn test_find_all_in_document_order() {
        let doc = parse("<a><x>1</x><y><x>2</x></y><x>3</x></a>").unwrap();
        let hits = doc.find_all("x");
        let texts: Vec<String> = hits.iter().map(|n| n.text()).collect();
        assert_eq!(texts, ["1", "2", "3"]);
    }

    #[test]
    fn test_find_first_prefers_earlier_match() {
        let doc = parse("<a><b><x>inner</x></b><x>outer</x></a>").unwrap();
        assert_eq!(doc.find_first("x").unwrap().text(), "inner");
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(parse("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_unclosed_element_fails() {
        assert!(parse("<a><b>").is_err());
    }
}
