//! Element selectors understood by every [`ContentTree`](super::ContentTree).

use std::borrow::Cow;

/// Minimal element view used for selector matching.
pub trait ElementLike {
	/// Lowercase tag name.
	fn tag_name(&self) -> &str;
	/// Attribute value.
	fn attribute(&self, name: &str) -> Option<&str>;
}

/// A subset of CSS selectors, restricted to single compound selectors and
/// lists of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
	/// `.name`
	Class(Cow<'static, str>),
	/// `#name`
	Id(Cow<'static, str>),
	/// `tag`
	Tag(Cow<'static, str>),
	/// `[name]`
	HasAttr(Cow<'static, str>),
	/// `[name="value"]`
	AttrEq(Cow<'static, str>, Cow<'static, str>),
	/// `[name^="prefix"]`
	AttrPrefix(Cow<'static, str>, Cow<'static, str>),
	/// Every selector matches.
	All(Vec<Selector>),
	/// At least one selector matches.
	Any(Vec<Selector>),
}

impl Selector {
	/// `.name`
	pub fn class(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Class(name.into())
	}

	/// `#name`
	pub fn id(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Id(name.into())
	}

	/// `tag`
	pub fn tag(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Tag(name.into())
	}

	/// `[name]`
	pub fn has_attr(name: impl Into<Cow<'static, str>>) -> Self {
		Self::HasAttr(name.into())
	}

	/// `[name="value"]`
	pub fn attr_eq(
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		Self::AttrEq(name.into(), value.into())
	}

	/// `[name^="prefix"]`
	pub fn attr_prefix(
		name: impl Into<Cow<'static, str>>,
		prefix: impl Into<Cow<'static, str>>,
	) -> Self {
		Self::AttrPrefix(name.into(), prefix.into())
	}

	/// Conjunction of `self` and `other`.
	pub fn and(self, other: Selector) -> Self {
		match self {
			Self::All(mut parts) => {
				parts.push(other);
				Self::All(parts)
			}
			first => Self::All(vec![first, other]),
		}
	}

	/// Alternative of `self` and `other`.
	pub fn or(self, other: Selector) -> Self {
		match self {
			Self::Any(mut parts) => {
				parts.push(other);
				Self::Any(parts)
			}
			first => Self::Any(vec![first, other]),
		}
	}

	/// Whether `element` matches.
	pub fn matches<E: ElementLike + ?Sized>(&self, element: &E) -> bool {
		match self {
			Self::Class(name) => element
				.attribute("class")
				.is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == &**name)),
			Self::Id(name) => element.attribute("id") == Some(&**name),
			Self::Tag(name) => element.tag_name().eq_ignore_ascii_case(name),
			Self::HasAttr(name) => element.attribute(name).is_some(),
			Self::AttrEq(name, value) => element.attribute(name) == Some(&**value),
			Self::AttrPrefix(name, prefix) => element
				.attribute(name)
				.is_some_and(|v| v.starts_with(&**prefix)),
			Self::All(parts) => parts.iter().all(|p| p.matches(element)),
			Self::Any(parts) => parts.iter().any(|p| p.matches(element)),
		}
	}

	/// Renders the selector as a CSS selector list.
	///
	/// Conjunctions over alternatives are expanded, so
	/// `a.(x|y)` renders as `a.x, a.y`.
	pub fn to_css(&self) -> String {
		self.compounds()
			.into_iter()
			.map(|c| c.render())
			.collect::<Vec<_>>()
			.join(", ")
	}

	fn compounds(&self) -> Vec<Compound> {
		match self {
			Self::Tag(name) => vec![Compound {
				tag: Some(name.to_string()),
				rest: String::new(),
			}],
			Self::Class(name) => vec![Compound::rest(format!(".{}", name))],
			Self::Id(name) => vec![Compound::rest(format!("#{}", name))],
			Self::HasAttr(name) => vec![Compound::rest(format!("[{}]", name))],
			Self::AttrEq(name, value) => vec![Compound::rest(format!(
				"[{}=\"{}\"]",
				name,
				css_escape(value)
			))],
			Self::AttrPrefix(name, prefix) => vec![Compound::rest(format!(
				"[{}^=\"{}\"]",
				name,
				css_escape(prefix)
			))],
			Self::Any(parts) => parts.iter().flat_map(|p| p.compounds()).collect(),
			Self::All(parts) => parts.iter().fold(vec![Compound::default()], |acc, part| {
				let alternatives = part.compounds();
				acc.iter()
					.flat_map(|left| alternatives.iter().map(move |right| left.merge(right)))
					.collect()
			}),
		}
	}
}

#[derive(Debug, Clone, Default)]
struct Compound {
	tag: Option<String>,
	rest: String,
}

impl Compound {
	fn rest(rest: String) -> Self {
		Self { tag: None, rest }
	}

	fn merge(&self, other: &Compound) -> Compound {
		Compound {
			tag: other.tag.clone().or_else(|| self.tag.clone()),
			rest: format!("{}{}", self.rest, other.rest),
		}
	}

	fn render(&self) -> String {
		match &self.tag {
			Some(tag) => format!("{}{}", tag, self.rest),
			None if self.rest.is_empty() => "*".to_string(),
			None => self.rest.clone(),
		}
	}
}

fn css_escape(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct El {
		tag: &'static str,
		attrs: Vec<(&'static str, &'static str)>,
	}

	impl ElementLike for El {
		fn tag_name(&self) -> &str {
			self.tag
		}

		fn attribute(&self, name: &str) -> Option<&str> {
			self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
		}
	}

	fn link() -> El {
		El {
			tag: "a",
			attrs: vec![
				("class", "btn product-item-link"),
				("href", "https://shop.example"),
				("data-product-id", "p1"),
			],
		}
	}

	#[rstest]
	#[case(Selector::class("product-item-link"), true)]
	#[case(Selector::class("product"), false)]
	#[case(Selector::tag("A"), true)]
	#[case(Selector::has_attr("data-product-id"), true)]
	#[case(Selector::attr_eq("data-product-id", "p2"), false)]
	#[case(Selector::attr_prefix("href", "http"), true)]
	#[case(Selector::attr_prefix("href", "/"), false)]
	#[case(Selector::tag("a").and(Selector::attr_prefix("href", "/")), false)]
	#[case(Selector::attr_prefix("href", "/").or(Selector::class("btn")), true)]
	fn test_matches(#[case] selector: Selector, #[case] expected: bool) {
		assert_eq!(selector.matches(&link()), expected);
	}

	#[rstest]
	fn test_to_css_expands_alternatives() {
		let selector = Selector::tag("a").and(
			Selector::attr_prefix("href", "http").or(Selector::attr_prefix("href", "/")),
		);
		assert_eq!(selector.to_css(), r#"a[href^="http"], a[href^="/"]"#);
	}

	#[rstest]
	fn test_to_css_puts_tag_first() {
		let selector = Selector::attr_eq("aria-label", "Subscribe").and(Selector::tag("button"));
		assert_eq!(selector.to_css(), r#"button[aria-label="Subscribe"]"#);
		assert_eq!(
			Selector::class("countdown-timer").to_css(),
			".countdown-timer"
		);
	}
}
