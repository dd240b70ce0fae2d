//! Portal mounts for framework-owned widgets.
//!
//! A widget region is cleared once and handed to a [`WidgetMounter`], which
//! roots an independent component tree in it. The engine keeps only the
//! returned [`MountedWidget`] handle so teardown can unmount it.

use super::{ActivationContext, ActivationReport, Activator};
use crate::error::ActivationError;
use crate::lifecycle::Resource;
use crate::markers::{
	self, ATTR_BIO_ID, ATTR_DESCRIPTION, ATTR_FORM_ID, ATTR_MARKETING_ID, ATTR_TITLE, MarkerKind,
};
use crate::tree::{ContentTree, NodeId};
use crate::view::View;
use crate::{debug_log, warn_log};
use std::rc::Rc;

const DEFAULT_BOOKING_TITLE: &str = "Book a Call";
const DEFAULT_PORTFOLIO_TITLE: &str = "Portfolio";

/// Kinds of widget regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
	/// Appointment booking.
	Booking,
	/// Custom form.
	Form,
	/// Portfolio gallery.
	Portfolio,
	/// Marketing slot.
	Marketing,
}

impl WidgetKind {
	/// Every kind, in activation order.
	pub const ALL: [WidgetKind; 4] = [Self::Booking, Self::Form, Self::Portfolio, Self::Marketing];

	/// Marker kind of the region.
	pub fn marker(self) -> MarkerKind {
		match self {
			Self::Booking => MarkerKind::BookingWidget,
			Self::Form => MarkerKind::FormWidget,
			Self::Portfolio => MarkerKind::PortfolioWidget,
			Self::Marketing => MarkerKind::MarketingWidget,
		}
	}
}

/// Properties passed to a mounted widget, read from the region's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetProps {
	/// Booking widget.
	Booking {
		/// Owning bio.
		bio_id: String,
		/// Heading.
		title: String,
		/// Optional blurb.
		description: Option<String>,
	},
	/// Form widget.
	Form {
		/// Form to render.
		form_id: String,
		/// Background color.
		background: Option<String>,
		/// Text color.
		text_color: Option<String>,
	},
	/// Portfolio widget.
	Portfolio {
		/// Owning bio.
		bio_id: String,
		/// Heading.
		title: String,
	},
	/// Marketing slot.
	Marketing {
		/// Slot to render.
		marketing_id: String,
		/// Owning bio, when known.
		bio_id: Option<String>,
	},
}

impl WidgetProps {
	/// Kind of widget these props are for.
	pub fn kind(&self) -> WidgetKind {
		match self {
			Self::Booking { .. } => WidgetKind::Booking,
			Self::Form { .. } => WidgetKind::Form,
			Self::Portfolio { .. } => WidgetKind::Portfolio,
			Self::Marketing { .. } => WidgetKind::Marketing,
		}
	}

	/// Reads the props of a `kind` region.
	///
	/// `page_bio` fills in a missing `data-bio-id`. Returns `None` when a
	/// required attribute is absent.
	pub fn read(tree: &dyn ContentTree, node: NodeId, kind: WidgetKind, page_bio: &str) -> Option<Self> {
		let attr = |name: &str| markers::config_attr(tree, node, name);
		let bio_id = attr(ATTR_BIO_ID).or_else(|| (!page_bio.is_empty()).then(|| page_bio.to_string()));
		match kind {
			WidgetKind::Booking => Some(Self::Booking {
				bio_id: bio_id?,
				title: attr(ATTR_TITLE).unwrap_or_else(|| DEFAULT_BOOKING_TITLE.to_string()),
				description: attr(ATTR_DESCRIPTION),
			}),
			WidgetKind::Form => Some(Self::Form {
				form_id: attr(ATTR_FORM_ID)?,
				background: attr("data-bg-color"),
				text_color: attr("data-text-color"),
			}),
			WidgetKind::Portfolio => Some(Self::Portfolio {
				bio_id: bio_id?,
				title: attr(ATTR_TITLE).unwrap_or_else(|| DEFAULT_PORTFOLIO_TITLE.to_string()),
			}),
			WidgetKind::Marketing => Some(Self::Marketing {
				marketing_id: attr(ATTR_MARKETING_ID)?,
				bio_id,
			}),
		}
	}
}

/// A widget rooted in the content tree.
pub trait MountedWidget {
	/// Tears the widget's component tree down.
	fn unmount(self: Box<Self>);
}

/// Framework-level mounting primitive.
pub trait WidgetMounter {
	/// Roots a widget in `node`, which the engine has already emptied.
	fn mount(
		&self,
		tree: &dyn ContentTree,
		node: NodeId,
		props: WidgetProps,
	) -> Result<Box<dyn MountedWidget>, ActivationError>;
}

/// Hands widget regions to the configured [`WidgetMounter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WidgetMountActivator;

impl Activator for WidgetMountActivator {
	fn name(&self) -> &'static str {
		"widget-mount"
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let mut report = ActivationReport::default();
		let Some(mounter) = ctx.mounter.clone() else {
			return Ok(report);
		};
		let tree = ctx.tree();
		let mut failure = None;
		for kind in WidgetKind::ALL {
			let marker = kind.marker();
			for node in markers::unclaimed(tree, tree.root(), marker) {
				let Some(props) = WidgetProps::read(tree, node, kind, &ctx.page.bio_id) else {
					debug_log!("{} region without required attributes skipped", marker.name());
					report.skipped += 1;
					continue;
				};
				if !markers::claim(tree, node, marker) {
					continue;
				}
				tree.replace_children(node, View::empty());
				match mounter.mount(tree, node, props) {
					Ok(widget) => {
						ctx.lifecycle.register(Resource::Widget(widget));
						report.claimed += 1;
					}
					Err(err) => {
						warn_log!("{} mount failed: {}", marker.name(), err);
						markers::unclaim(tree, node, marker);
						failure.get_or_insert(err);
					}
				}
			}
		}
		match failure {
			Some(err) => Err(err),
			None => Ok(report),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::Harness;
	use crate::tree::Selector;
	use rstest::rstest;

	const REGIONS: &str = r##"
		<div class="custom-booking-block" data-title="Talk to me"><p>Loading…</p></div>
		<div class="custom-form-block" data-form-id="f1" data-bg-color="#000"></div>
		<div class="custom-form-block"></div>
		<div class="custom-portfolio-block" data-bio-id="other"></div>
		<div class="custom-marketing-block" data-marketing-id="m1"></div>"##;

	#[rstest]
	fn test_mounts_every_region_once() {
		let harness = Harness::new(REGIONS);
		let ctx = harness.context();
		let report = WidgetMountActivator.activate(&ctx).unwrap();
		assert_eq!(report.claimed, 4);
		assert_eq!(report.skipped, 1);
		assert_eq!(
			harness.mounter.mounted(),
			vec![
				WidgetProps::Booking {
					bio_id: "bio-1".into(),
					title: "Talk to me".into(),
					description: None,
				},
				WidgetProps::Form {
					form_id: "f1".into(),
					background: Some("#000".into()),
					text_color: None,
				},
				WidgetProps::Portfolio {
					bio_id: "other".into(),
					title: "Portfolio".into(),
				},
				WidgetProps::Marketing {
					marketing_id: "m1".into(),
					bio_id: Some("bio-1".into()),
				},
			]
		);

		let booking = harness
			.tree
			.query_first(harness.tree.root(), &Selector::class("custom-booking-block"))
			.unwrap();
		assert_eq!(harness.tree.inner_html(booking), "");

		let again = WidgetMountActivator.activate(&ctx).unwrap();
		assert_eq!(again.claimed, 0);
		assert_eq!(harness.mounter.mounted().len(), 4);
	}

	#[rstest]
	fn test_teardown_unmounts_widgets() {
		let harness = Harness::new(REGIONS);
		let ctx = harness.context();
		WidgetMountActivator.activate(&ctx).unwrap();
		assert_eq!(ctx.lifecycle.teardown_all(), 4);
		assert_eq!(harness.mounter.unmounted(), 4);
	}

	#[rstest]
	fn test_failed_mount_is_retried_next_scan() {
		let harness = Harness::new(r#"<div class="custom-booking-block"></div>"#);
		harness.mounter.fail_next(1);
		let ctx = harness.context();
		let err = WidgetMountActivator.activate(&ctx).unwrap_err();
		assert!(matches!(err, ActivationError::MountFailed(_)));

		let report = WidgetMountActivator.activate(&ctx).unwrap();
		assert_eq!(report.claimed, 1);
		assert_eq!(harness.mounter.mounted().len(), 1);
	}

	#[rstest]
	fn test_booking_without_any_bio_is_skipped() {
		let harness = Harness::new(r#"<div class="custom-booking-block"></div>"#).with_page(|mut p| {
			p.bio_id.clear();
			p
		});
		let ctx = harness.context();
		let report = WidgetMountActivator.activate(&ctx).unwrap();
		assert_eq!(report, ActivationReport { claimed: 0, skipped: 1 });
	}
}
