//! HTML fragment parsing for sanitized markup.
//!
//! Fragments go through the html5ever tree builder (via `scraper`) in a
//! `<body>` context, so the resulting views follow browser parsing rules:
//! implied end tags, ignored stray end tags, decoded character references
//! and raw text in `script` and `style`. Comments, doctypes and processing
//! instructions are dropped.

use crate::view::{ElementView, View};
use scraper::{ElementRef, Html, Node};
use std::borrow::Cow;

/// Parses a markup fragment into views.
pub fn parse_fragment(input: &str) -> Vec<View> {
	let document = Html::parse_fragment(input);
	// the fragment lands under a synthetic <html> root
	child_views(document.root_element())
}

fn child_views(parent: ElementRef<'_>) -> Vec<View> {
	parent
		.children()
		.filter_map(|child| match child.value() {
			Node::Text(text) => Some(View::Text(Cow::Owned(String::from(&**text)))),
			Node::Element(_) => ElementRef::wrap(child).map(|el| View::Element(element_view(el))),
			_ => None,
		})
		.collect()
}

fn element_view(el: ElementRef<'_>) -> ElementView {
	let value = el.value();
	let mut view = ElementView::new(value.name().to_string());
	for (name, attr) in value.attrs() {
		view = view.attr(name.to_string(), attr.to_string());
	}
	view.children(child_views(el))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn render(input: &str) -> String {
		View::Fragment(parse_fragment(input)).render_to_string()
	}

	#[rstest]
	fn test_parse_nested_elements() {
		let html = r#"<div class="countdown-timer" data-date="2030-01-01"><span class="days">00</span></div>"#;
		assert_eq!(render(html), html);
	}

	#[rstest]
	fn test_parse_void_and_self_closing() {
		assert_eq!(
			render(r#"<p>a<br>b<img src="x.png"/></p>"#),
			r#"<p>a<br />b<img src="x.png" /></p>"#
		);
	}

	#[rstest]
	fn test_parse_attribute_forms() {
		let views = parse_fragment(r#"<input type=email required data-x='a "b"'>"#);
		let View::Element(el) = &views[0] else {
			panic!("expected element");
		};
		assert_eq!(el.get_attr("type"), Some("email"));
		assert_eq!(el.get_attr("required"), Some(""));
		assert_eq!(el.get_attr("data-x"), Some(r#"a "b""#));
	}

	#[rstest]
	fn test_parse_skips_comments_and_stray_end_tags() {
		assert_eq!(render("<!-- note --><b>x</i></b></div>tail"), "<b>x</b>tail");
	}

	#[rstest]
	fn test_parse_implies_end_tags() {
		assert_eq!(render("<ul><li>a<li>b"), "<ul><li>a</li><li>b</li></ul>");
		assert_eq!(render("<p>one<p>two"), "<p>one</p><p>two</p>");
	}

	#[rstest]
	fn test_parse_uppercase_tags() {
		assert_eq!(render("<DIV ID=\"x\">y</DIV>"), r#"<div id="x">y</div>"#);
	}

	#[rstest]
	#[case("a &amp; b", "a & b")]
	#[case("&lt;tag&gt;", "<tag>")]
	#[case("&#39;q&#x27;", "'q'")]
	#[case("AT&T", "AT&T")]
	fn test_character_references_are_decoded(#[case] input: &str, #[case] expected: &str) {
		let views = parse_fragment(input);
		assert_eq!(View::Fragment(views).text_content(), expected);
	}

	#[rstest]
	fn test_attribute_references_are_decoded() {
		let views = parse_fragment(r#"<a href="/x?a=1&amp;b=2">x</a>"#);
		let View::Element(el) = &views[0] else {
			panic!("expected element");
		};
		assert_eq!(el.get_attr("href"), Some("/x?a=1&b=2"));
	}

	#[rstest]
	fn test_script_body_is_kept_as_text() {
		let views = parse_fragment("<script>if (a < b) {}</script><p>x</p>");
		assert_eq!(views.len(), 2);
		assert_eq!(views[0].text_content(), "if (a < b) {}");
	}

	#[rstest]
	fn test_empty_input_has_no_views() {
		assert!(parse_fragment("").is_empty());
	}
}
