//! Session-scoped identifiers.
//!
//! The engine persists nothing across page loads except the session token
//! and the per-bio "already visited" marker, both in session storage.

use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;

/// Storage key of the session token.
pub const SESSION_KEY: &str = "portyo_session";

/// Session-scoped key/value storage.
pub trait SessionStore {
	/// Reads a value.
	fn get(&self, key: &str) -> Option<String>;
	/// Writes a value.
	fn set(&self, key: &str, value: &str);
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
	values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.values.borrow().len()
	}

	/// Whether the store is empty.
	pub fn is_empty(&self) -> bool {
		self.values.borrow().is_empty()
	}
}

impl SessionStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.values.borrow().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) {
		self.values
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
	}
}

/// Returns the session token, creating it on first use.
pub fn session_id(store: &dyn SessionStore) -> String {
	if let Some(existing) = store.get(SESSION_KEY).filter(|id| !id.is_empty()) {
		return existing;
	}
	let id = Uuid::new_v4().to_string();
	store.set(SESSION_KEY, &id);
	id
}

/// Records a visit to `bio_id`. Returns true only for the first visit of the session.
pub fn first_visit(store: &dyn SessionStore, bio_id: &str) -> bool {
	let key = format!("visited_{}", bio_id);
	if store.get(&key).is_some() {
		return false;
	}
	store.set(&key, "true");
	true
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_session_id_is_stable() {
		let store = MemoryStore::new();
		let first = session_id(&store);
		assert_eq!(Uuid::parse_str(&first).ok().map(|u| u.get_version_num()), Some(4));
		assert_eq!(session_id(&store), first);
		assert_eq!(store.len(), 1);
	}

	#[rstest]
	fn test_session_id_replaces_blank_value() {
		let store = MemoryStore::new();
		store.set(SESSION_KEY, "");
		assert!(!session_id(&store).is_empty());
	}

	#[rstest]
	fn test_first_visit_per_bio() {
		let store = MemoryStore::new();
		assert!(first_visit(&store, "a"));
		assert!(!first_visit(&store, "a"));
		assert!(first_visit(&store, "b"));
	}
}
