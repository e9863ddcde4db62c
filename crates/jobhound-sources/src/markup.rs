//! HTML body helpers.

use jobhound_core::normalize::collapse_whitespace;
use jobhound_core::{Description, DescriptionFormat};
use scraper::Html;

/// Strip tags from an HTML fragment and collapse whitespace.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Build a description in the requested format from an HTML body.
///
/// Returns `None` for an empty body.
#[must_use]
pub fn render_description(html: &str, format: DescriptionFormat) -> Option<Description> {
    let text = match format {
        DescriptionFormat::Html => html.trim().to_string(),
        DescriptionFormat::Plain => html_to_text(html),
    };
    (!text.is_empty()).then_some(Description { format, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            html_to_text("<p>Build <b>fast</b>\n services.</p><ul><li>Rust</li></ul>"),
            "Build fast services. Rust"
        );
    }

    #[test]
    fn test_render_description() {
        let html = "<p>Remote friendly</p>";
        let plain = render_description(html, DescriptionFormat::Plain).expect("plain");
        assert_eq!(plain.text, "Remote friendly");
        assert_eq!(plain.format, DescriptionFormat::Plain);

        let raw = render_description(html, DescriptionFormat::Html).expect("html");
        assert_eq!(raw.text, html);

        assert!(render_description("  ", DescriptionFormat::Html).is_none());
    }
}
