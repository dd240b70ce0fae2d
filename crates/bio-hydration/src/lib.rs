//! Bio Hydration - content-tree hydration engine for bio pages
//!
//! A bio page body is authored markup produced elsewhere. After it has been
//! sanitized and inserted, this crate finds the marker elements inside it
//! (countdowns, social feeds, content cards, dialogs, checkout links, widget
//! regions) and attaches the behavior each of them stands for.
//!
//! ## Architecture
//!
//! - [`tree`]: read/observe/patch interface over the hosted content tree
//! - [`view`]: patches expressed as view values
//! - [`markers`]: marker selectors and per-kind activation flags
//! - [`activators`]: one idempotent activation procedure per feature
//! - [`scheduler`]: initial, debounced and safety scans
//! - [`tabs`]: links/blog/shop routing and lazy tab loaders
//! - [`facade`]: page actions callable from authored markup
//! - [`engine`]: mount/unmount of one engine lifetime
//! - [`page`]: markup in, hydrated page out
//! - [`lifecycle`]: teardown bookkeeping
//! - [`api`]: backend contracts and the `reqwest` client
//! - [`host`], [`browser`], [`session`]: runtime collaborators
//! - `dom` (wasm32): `web-sys` implementations of the collaborators
//!
//! ## Example
//!
//! ```ignore
//! use bio_hydration::{BioPage, HttpApi, HydrationConfig, HydrationEngine, PageContext};
//! use bio_hydration::dom::{WebBrowser, WebHost, WebSessionStore, WebTree};
//! use std::rc::Rc;
//!
//! let config = HydrationConfig::new().with_api_base_url("https://api.example.com");
//! let tree = WebTree::from_element_id("bio-content")?;
//! let engine = HydrationEngine::builder(
//! 	tree.clone(),
//! 	Rc::new(WebHost::new()),
//! 	Rc::new(WebBrowser::new()),
//! 	Rc::new(HttpApi::new(&config.api_base_url)),
//! )
//! .session(Rc::new(WebSessionStore))
//! .config(config)
//! .page(PageContext::new("bio-123"))
//! .build()?;
//!
//! let page = BioPage::new(engine, tree.root(), Rc::new(my_sanitizer));
//! page.render(&html)?;
//! ```

#![warn(missing_docs)]

pub mod activators;
pub mod api;
pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod markers;
pub mod page;
pub mod sanitize;
pub mod scheduler;
pub mod session;
pub mod tabs;
pub mod tree;
pub mod view;

#[cfg(target_arch = "wasm32")]
pub mod dom;

// Paths used by the logging macros in downstream crates
#[doc(hidden)]
#[cfg(not(target_arch = "wasm32"))]
pub use tracing;
#[doc(hidden)]
#[cfg(target_arch = "wasm32")]
pub use web_sys;

// In-memory collaborators for tests and downstream hosts
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activators::{
	ActivationContext, ActivationReport, Activator, DetailPresenter, MountedWidget, WidgetKind,
	WidgetMounter, WidgetProps,
};
pub use api::{BioApi, HttpApi};
pub use browser::{Browser, MemoryBrowser, PopupFeatures};
pub use config::{HydrationConfig, PageContext, PopupSize};
pub use engine::{HydrationEngine, HydrationEngineBuilder};
pub use error::{ActivationError, ApiError, HydrationError};
pub use facade::PageActions;
pub use host::{Host, VirtualHost};
pub use lifecycle::LifecycleStats;
pub use page::BioPage;
pub use sanitize::{SafeMarkup, Sanitizer};
pub use scheduler::{ScanReport, ScanStats};
pub use session::{MemoryStore, SessionStore};
pub use tabs::Tab;
pub use tree::{ContentTree, MemoryTree, NodeId, Selector};
pub use view::View;
