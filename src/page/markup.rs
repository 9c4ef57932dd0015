//! Markup fragments for the in-memory document.
//!
//! A forgiving, regex-driven fragment parser: enough HTML to make injected
//! markup queryable (elements, attributes, text, comments, void and raw-text
//! elements). Unbalanced closing tags are ignored and unclosed elements are
//! closed at the end of input, the way browsers recover.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// Constants
// ============================================================================

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Comments, opening tags and closing tags.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("tag pattern is valid")
});

/// A single attribute inside an opening tag.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

// ============================================================================
// Fragment
// ============================================================================

/// Parsed node, detached from any document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    /// Element with lowercase tag and attributes in source order.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Fragment>,
    },
    /// Decoded text.
    Text(String),
}

/// Open element on the parse stack.
struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Fragment>,
}

impl OpenElement {
    fn close(self) -> Fragment {
        Fragment::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an HTML fragment.
pub(crate) fn parse_fragment(markup: &str) -> Vec<Fragment> {
    let mut roots: Vec<Fragment> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TAG_RE.captures_at(markup, pos) {
        let Some(whole) = caps.get(0) else { break };
        push_text(&mut stack, &mut roots, &markup[pos..whole.start()]);
        pos = whole.end();

        // Comments have no tag group.
        let Some(tag) = caps.get(2) else { continue };
        let tag = tag.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if closing {
            if let Some(depth) = stack.iter().rposition(|open| open.tag == tag) {
                while stack.len() > depth {
                    if let Some(open) = stack.pop() {
                        push_node(&mut stack, &mut roots, open.close());
                    }
                }
            }
            continue;
        }

        let attributes = caps
            .get(3)
            .map(|m| parse_attributes(m.as_str()))
            .unwrap_or_default();
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        if VOID_ELEMENTS.contains(&tag.as_str()) || self_closing {
            push_node(
                &mut stack,
                &mut roots,
                Fragment::Element {
                    tag,
                    attributes,
                    children: Vec::new(),
                },
            );
            continue;
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let (body, resume) = raw_text(markup, pos, &tag);
            let children = if body.is_empty() {
                Vec::new()
            } else {
                vec![Fragment::Text(body.to_string())]
            };
            push_node(
                &mut stack,
                &mut roots,
                Fragment::Element {
                    tag,
                    attributes,
                    children,
                },
            );
            pos = resume;
            continue;
        }

        stack.push(OpenElement {
            tag,
            attributes,
            children: Vec::new(),
        });
    }

    push_text(&mut stack, &mut roots, &markup[pos..]);

    while let Some(open) = stack.pop() {
        push_node(&mut stack, &mut roots, open.close());
    }

    roots
}

/// Parses the attribute section of an opening tag.
fn parse_attributes(section: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for caps in ATTR_RE.captures_iter(section) {
        let Some(name) = caps.get(1) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default();

        // First occurrence wins.
        if !attributes.iter().any(|(existing, _)| *existing == name) {
            attributes.push((name, value));
        }
    }
    attributes
}

/// Returns the raw body of a script/style element and the resume offset.
fn raw_text<'a>(markup: &'a str, start: usize, tag: &str) -> (&'a str, usize) {
    let closing = format!("</{tag}");
    let rest = &markup[start..];
    let lowered = rest.to_ascii_lowercase();

    match lowered.find(&closing) {
        Some(offset) => {
            let body = &rest[..offset];
            let after = start + offset;
            let resume = markup[after..]
                .find('>')
                .map_or(markup.len(), |gt| after + gt + 1);
            (body, resume)
        }
        None => (rest, markup.len()),
    }
}

fn push_text(stack: &mut [OpenElement], roots: &mut Vec<Fragment>, text: &str) {
    if text.is_empty() {
        return;
    }
    push_node(stack, roots, Fragment::Text(decode_entities(text)));
}

fn push_node(stack: &mut [OpenElement], roots: &mut Vec<Fragment>, node: Fragment) {
    match stack.last_mut() {
        Some(open) => open.children.push(node),
        None => roots.push(node),
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Decodes the handful of entities the serializer emits.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Escapes text content.
pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

/// Escapes an attribute value for a double-quoted attribute.
pub(crate) fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\u{a0}', "&nbsp;")
}

/// Returns `true` for elements serialized without a closing tag.
pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Returns `true` for elements whose text is serialized unescaped.
pub(crate) fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attributes: &[(&str, &str)], children: Vec<Fragment>) -> Fragment {
        Fragment::Element {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    fn text(value: &str) -> Fragment {
        Fragment::Text(value.to_string())
    }

    #[test]
    fn test_simple_paragraph() {
        assert_eq!(
            parse_fragment("<p>hi</p>"),
            vec![element("p", &[], vec![text("hi")])]
        );
    }

    #[test]
    fn test_single_quoted_attribute() {
        assert_eq!(
            parse_fragment("<div id='s'></div>"),
            vec![element("div", &[("id", "s")], vec![])]
        );
    }

    #[test]
    fn test_mixed_attributes() {
        let parsed = parse_fragment(r#"<input type=checkbox checked data-x="a &amp; b">"#);
        assert_eq!(
            parsed,
            vec![element(
                "input",
                &[("type", "checkbox"), ("checked", ""), ("data-x", "a & b")],
                vec![]
            )]
        );
    }

    #[test]
    fn test_nested_and_text() {
        let parsed = parse_fragment("before<ul><li>a</li><li>b</li></ul>after");
        assert_eq!(
            parsed,
            vec![
                text("before"),
                element(
                    "ul",
                    &[],
                    vec![
                        element("li", &[], vec![text("a")]),
                        element("li", &[], vec![text("b")])
                    ]
                ),
                text("after"),
            ]
        );
    }

    #[test]
    fn test_script_body_is_raw() {
        let parsed = parse_fragment("<script>if (a < b && c) { x('</p>'); }</script><p>z</p>");
        assert_eq!(
            parsed,
            vec![
                element(
                    "script",
                    &[],
                    vec![text("if (a < b && c) { x('</p>'); }")]
                ),
                element("p", &[], vec![text("z")]),
            ]
        );
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let parsed = parse_fragment("<div><span>x</div></em>tail");
        assert_eq!(
            parsed,
            vec![
                element("div", &[], vec![element("span", &[], vec![text("x")])]),
                text("tail"),
            ]
        );
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(
            parse_fragment("<!-- note --><b>x</b>"),
            vec![element("b", &[], vec![text("x")])]
        );
    }

    #[test]
    fn test_self_closing_and_void() {
        let parsed = parse_fragment("<br><my-widget/>x");
        assert_eq!(
            parsed,
            vec![
                element("br", &[], vec![]),
                element("my-widget", &[], vec![]),
                text("x")
            ]
        );
    }

    #[test]
    fn test_escape_helpers() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attribute(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
