//! Lenient HTML fragment parser.
//!
//! Markup reaching the reference passes has already been rendered and
//! sanitized upstream, so this parser favors never failing over fidelity to the
//! full HTML5 tree-construction rules: unknown end tags are dropped and
//! unclosed elements close at end of input.

use super::{Document, Element, NodeData, NodeId, VOID_ELEMENTS};

/// Elements whose body is kept verbatim up to the matching end tag.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Parse `html` and append the resulting nodes under `parent`.
pub(super) fn parse_into(doc: &mut Document, parent: NodeId, html: &str) {
    let mut stack: Vec<(String, NodeId)> = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let current = stack.last().map_or(parent, |(_, id)| return *id);

        if let Some(after) = rest.strip_prefix("<!--") {
            let (body, tail) = after.split_once("-->").unwrap_or((after, ""));
            let node = doc.create(NodeData::Comment(body.to_string()));
            doc.append(current, node);
            rest = tail;
            continue;
        }

        if let Some(after) = rest.strip_prefix("</") {
            if starts_with_tag_name(after) {
                let (name, tail) = read_tag_name(after);
                rest = tail.split_once('>').map_or("", |(_, t)| return t);
                close_element(&mut stack, &name);
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix("<!") {
            // Doctype and other declarations carry nothing worth keeping.
            rest = after.split_once('>').map_or("", |(_, t)| return t);
            continue;
        }

        if let Some(after) = rest.strip_prefix('<') {
            if starts_with_tag_name(after) {
                rest = open_element(doc, current, &mut stack, after);
                continue;
            }
        }

        let end = next_markup_start(rest);
        let (text, tail) = rest.split_at(end);
        let node = doc.create(NodeData::Text(decode_entities(text)));
        doc.append(current, node);
        rest = tail;
    }
}

/// Pop the stack down to the innermost open element called `name`.
/// End tags with no matching open element are ignored.
fn close_element(stack: &mut Vec<(String, NodeId)>, name: &str) {
    if let Some(pos) = stack.iter().rposition(|(open, _)| return open == name) {
        stack.truncate(pos);
    }
}

/// Decode the character references that survive sanitization.
pub(super) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        match decode_one_entity(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = tail.get(consumed..).unwrap_or("");
            },
            None => {
                out.push('&');
                rest = tail.get(1..).unwrap_or("");
            },
        }
    }
    out.push_str(rest);
    return out;
}

/// Decode one reference at the start of `input` (which begins with `&`).
/// Returns the character and the number of bytes consumed.
fn decode_one_entity(input: &str) -> Option<(char, usize)> {
    let semi = input.find(';')?;
    let body = input.get(1..semi)?;
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" | "#39" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let number = body.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        },
    };
    return Some((ch, semi.saturating_add(1)));
}

/// Byte offset of the next `<` after the first character that starts markup,
/// or the end of `input`. The text branch only runs when `input` itself does not
/// start with markup, so skipping offset 0 always makes progress.
fn next_markup_start(input: &str) -> usize {
    return input
        .char_indices()
        .filter(|&(at, ch)| return at > 0 && ch == '<')
        .map(|(at, _)| return at)
        .find(|&at| return input.get(at..).is_some_and(starts_markup))
        .unwrap_or(input.len());
}

/// Whether `input` opens a tag, an end tag, a comment or a declaration.
fn starts_markup(input: &str) -> bool {
    if input.starts_with("<!") {
        return true;
    }
    if let Some(after) = input.strip_prefix("</") {
        return starts_with_tag_name(after);
    }
    return input.strip_prefix('<').is_some_and(starts_with_tag_name);
}

/// Parse a start tag (after its `<`) and push the element. Returns the input
/// remaining after the tag, or after the raw text body for `script`/`style`.
fn open_element<'a>(
    doc: &mut Document,
    current: NodeId,
    stack: &mut Vec<(String, NodeId)>,
    after_lt: &'a str,
) -> &'a str {
    let (name, mut rest) = read_tag_name(after_lt);
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        rest = rest.trim_start();
        if let Some(tail) = rest.strip_prefix("/>") {
            self_closing = true;
            rest = tail;
            break;
        }
        if let Some(tail) = rest.strip_prefix('>') {
            rest = tail;
            break;
        }
        if let Some(tail) = rest.strip_prefix('/') {
            rest = tail;
            continue;
        }
        if rest.is_empty() {
            break;
        }
        let (attr, tail) = read_attribute(rest);
        attrs.push(attr);
        rest = tail;
    }

    let node = doc.create(NodeData::Element(Element { attrs, name: name.clone() }));
    doc.append(current, node);

    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
        let closing = format!("</{name}");
        let end = rest.to_ascii_lowercase().find(&closing).unwrap_or(rest.len());
        let (body, tail) = rest.split_at(end);
        if !body.is_empty() {
            let text = doc.create(NodeData::Text(body.to_string()));
            doc.append(node, text);
        }
        return tail.split_once('>').map_or("", |(_, t)| return t);
    }

    if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
        stack.push((name, node));
    }
    return rest;
}

/// Read one `name`, `name=value`, `name="value"` or `name='value'` attribute.
fn read_attribute(input: &str) -> ((String, String), &str) {
    let name_end = input
        .find(|c: char| return c.is_whitespace() || c == '=' || c == '>' || c == '/')
        .unwrap_or(input.len());
    // Guarantee progress on stray characters such as a lone `=`.
    let name_end = if name_end == 0 { input.chars().next().map_or(0, char::len_utf8) } else { name_end };
    let (name, rest) = input.split_at(name_end);
    let name = name.to_ascii_lowercase();

    let trimmed = rest.trim_start();
    let Some(after_eq) = trimmed.strip_prefix('=') else {
        return ((name, String::new()), rest);
    };
    let after_eq = after_eq.trim_start();

    for quote in ['"', '\''] {
        if let Some(quoted) = after_eq.strip_prefix(quote) {
            let (value, tail) = quoted.split_once(quote).unwrap_or((quoted, ""));
            return ((name, decode_entities(value)), tail);
        }
    }

    let value_end = after_eq
        .find(|c: char| return c.is_whitespace() || c == '>')
        .unwrap_or(after_eq.len());
    let (value, tail) = after_eq.split_at(value_end);
    return ((name, decode_entities(value)), tail);
}

/// Read a lowercased tag name from the start of `input`.
fn read_tag_name(input: &str) -> (String, &str) {
    let end = input
        .find(|c: char| return !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(input.len());
    let (name, rest) = input.split_at(end);
    return (name.to_ascii_lowercase(), rest);
}

/// Whether `input` begins with an ASCII letter, as a tag name must.
fn starts_with_tag_name(input: &str) -> bool {
    return input.chars().next().is_some_and(|c| return c.is_ascii_alphabetic());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_entities("&lt;b&gt; &amp; &#39;x&#x27;"), "<b> & 'x'");
    }

    #[test]
    fn leaves_unknown_references_alone() {
        assert_eq!(decode_entities("AT&T &bogus; &"), "AT&T &bogus; &");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let doc = Document::parse("1 < 2 and 3 <4");
        assert_eq!(doc.text_content(doc.root()), "1 < 2 and 3 <4");
    }

    #[test]
    fn round_trips_ordinary_markup() {
        let html = "<p class=\"x\">Hello <a href=\"/a?b=1&amp;c=2\">link</a><br>bye</p><!-- note -->";
        assert_eq!(Document::parse(html).to_html(), html);
    }

    #[test]
    fn unclosed_and_stray_tags_do_not_fail() {
        let doc = Document::parse("<p><em>open</span> tail");
        assert_eq!(doc.to_html(), "<p><em>open tail</em></p>");
    }

    #[test]
    fn style_body_is_raw_text() {
        let doc = Document::parse("<style>a > b { color: red }</style>");
        assert_eq!(doc.to_html(), "<style>a > b { color: red }</style>");
    }
}
