//! Sized images.
//!
//! Markdown has no syntax for pixel dimensions, so an image the editor has
//! resized is written as a lone `<img>` tag and read back from one.

use std::sync::LazyLock;

use regex::Regex;

static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<img\s([^>]*?)/?>\s*$").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z][a-z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTag {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Parses a raw-markup fragment consisting of exactly one `<img>` tag.
pub fn parse_img_tag(raw: &str) -> Option<ImageTag> {
    let attrs = IMG_TAG_RE.captures(raw)?.get(1)?.as_str();
    let mut tag = ImageTag::default();
    for caps in ATTR_RE.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        let value = html_escape::decode_html_entities(value).into_owned();
        match caps[1].to_ascii_lowercase().as_str() {
            "src" => tag.src = value,
            "alt" => tag.alt = value,
            "title" => tag.title = Some(value),
            "width" => tag.width = parse_pixels(&value),
            "height" => tag.height = parse_pixels(&value),
            _ => {}
        }
    }
    (!tag.src.is_empty()).then_some(tag)
}

/// Renders an `<img>` tag; attribute values are HTML-escaped.
pub fn render_img_tag(tag: &ImageTag) -> String {
    let mut out = format!(
        "<img src=\"{}\" alt=\"{}\"",
        html_escape::encode_double_quoted_attribute(&tag.src),
        html_escape::encode_double_quoted_attribute(&tag.alt)
    );
    if let Some(title) = &tag.title {
        out.push_str(&format!(
            " title=\"{}\"",
            html_escape::encode_double_quoted_attribute(title)
        ));
    }
    if let Some(width) = tag.width {
        out.push_str(&format!(" width=\"{width}\""));
    }
    if let Some(height) = tag.height {
        out.push_str(&format!(" height=\"{height}\""));
    }
    out.push('>');
    out
}

fn parse_pixels(value: &str) -> Option<u32> {
    value.trim().trim_end_matches("px").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_sized_image() {
        let tag = parse_img_tag(r#"<img src="a.png" alt="A &amp; B" width="320" height='200px' />"#)
            .unwrap();
        assert_eq!(
            tag,
            ImageTag {
                src: "a.png".into(),
                alt: "A & B".into(),
                title: None,
                width: Some(320),
                height: Some(200),
            }
        );
    }

    #[test]
    fn rejects_other_markup() {
        assert_eq!(parse_img_tag("<div>x</div>"), None);
        assert_eq!(parse_img_tag("<img alt=\"no source\">"), None);
        assert_eq!(parse_img_tag("<img src=a.png> trailing text"), None);
    }

    #[test]
    fn render_then_parse_preserves_fields() {
        let tag = ImageTag {
            src: "cat \"1\".png".into(),
            alt: "cat".into(),
            title: Some("Cat".into()),
            width: Some(10),
            height: None,
        };
        assert_eq!(parse_img_tag(&render_img_tag(&tag)), Some(tag));
    }
}
