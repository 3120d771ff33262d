//! Small helpers for writing SVG markup by hand.

fn is_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Drops characters XML 1.0 cannot carry.
pub fn sanitize_text(text: &str) -> String {
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

/// Escapes text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// ` stroke-dasharray="…"` or nothing.
pub fn dash_attr(dash: Option<&str>) -> String {
    dash.map(|d| format!(r#" stroke-dasharray="{}""#, d))
        .unwrap_or_default()
}

/// Wraps `body` in a standalone SVG document of the given size.
pub fn document(width: f64, height: f64, background: &str, defs: &str, body: &str) -> String {
    let defs = if defs.is_empty() {
        String::new()
    } else {
        format!("<defs>{}</defs>\n", defs)
    };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
{defs}<rect width="{w:.0}" height="{h:.0}" fill="{bg}"/>
{body}
</svg>"#,
        w = width,
        h = height,
        bg = background,
        defs = defs,
        body = body,
    )
}
