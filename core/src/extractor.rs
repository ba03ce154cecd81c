/// Locates the repeated result records inside an exported attack document.
///
/// Exports differ between tool versions: most wrap each attempt in an
/// `<item>` element, older ones use alternate container names, and some dump
/// bare `<request>`/`<response>` sequences with no wrapper at all. The
/// strategies below are tried in order; the first that yields records wins.
use log::{debug, warn};

use crate::dom::XmlNode;

/// Element name tried first when locating result records.
pub const PRIMARY_ITEM_TAG: &str = "item";

/// Alternate record containers, unioned when no `item` elements exist.
pub const FALLBACK_ITEM_TAGS: &[&str] = &["attackitem", "row", "requestitem"];

/// One attack-result record pulled out of the document.
///
/// Every field is optional; request and response are each independently so.
#[derive(Debug, Clone)]
pub struct ResultItem<'a> {
    pub position: Option<String>,
    pub status: Option<String>,
    pub length: Option<String>,
    pub host: Option<String>,
    pub request: Option<&'a XmlNode>,
    pub response: Option<&'a XmlNode>,
}

/// Extracts the ordered record sequence from a parsed document.
///
/// Strategy order: `<item>` elements anywhere in the document; the union of
/// the alternate container tags; positional pairing of bare `<request>` and
/// `<response>` elements (truncated to the shorter sequence). An empty
/// return means the document holds nothing recognizable; the renderer
/// emits a placeholder entry for that case, it is not an error.
pub fn extract_items(document: &XmlNode) -> Vec<ResultItem<'_>> {
    let mut containers = document.find_all(PRIMARY_ITEM_TAG);
    if containers.is_empty() {
        for tag in FALLBACK_ITEM_TAGS {
            containers.extend(document.find_all(tag));
        }
        if !containers.is_empty() {
            debug!(
                "no <{}> elements; using {} alternate container(s)",
                PRIMARY_ITEM_TAG,
                containers.len()
            );
        }
    }
    if !containers.is_empty() {
        return containers.into_iter().map(item_from_container).collect();
    }

    let requests = document.find_all("request");
    let responses = document.find_all("response");
    let pairs: Vec<_> = requests.into_iter().zip(responses).collect();
    if pairs.is_empty() {
        warn!("no result records or request/response pairs found in document");
        return Vec::new();
    }
    debug!("synthesizing {} record(s) from request/response pairs", pairs.len());
    pairs
        .into_iter()
        .map(|(request, response)| item_from_pair(request, response))
        .collect()
}

fn item_from_container(container: &XmlNode) -> ResultItem<'_> {
    ResultItem {
        position: field_text(container.find_first("position")),
        status: field_text(container.find_first("status")),
        length: field_text(container.find_first("length")),
        host: field_text(container.find_first("host")),
        request: container.find_first("request"),
        response: container.find_first("response"),
    }
}

/// Synthesizes one record from a bare request/response pair; header fields
/// are searched in the request subtree first, then the response subtree.
fn item_from_pair<'a>(request: &'a XmlNode, response: &'a XmlNode) -> ResultItem<'a> {
    let scopes = [request, response];
    ResultItem {
        position: field_in(&scopes, "position"),
        status: field_in(&scopes, "status"),
        length: field_in(&scopes, "length"),
        host: field_in(&scopes, "host"),
        request: Some(request),
        response: Some(response),
    }
}

fn field_in<'a>(scopes: &[&'a XmlNode], name: &str) -> Option<String> {
    scopes
        .iter()
        .find_map(|scope| field_text(scope.find_first(name)))
}

fn field_text(node: Option<&XmlNode>) -> Option<String> {
    let text = node?.text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
