//! Dotted field paths (`"address.city"`, `"tags.0"`)

use bson::{Bson, Document};

use crate::error::{NoSQLError, Result};

/// Resolve a dotted path. Numeric segments index into arrays.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
	let mut segments = path.split('.');
	let mut current = doc.get(segments.next()?)?;
	for segment in segments {
		current = match current {
			Bson::Document(inner) => inner.get(segment)?,
			Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current)
}

/// Assign `value` at `path`, creating intermediate documents as needed.
pub(crate) fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<()> {
	match path.split_once('.') {
		None => {
			doc.insert(path, value);
			Ok(())
		}
		Some((head, rest)) => {
			if !doc.contains_key(head) {
				doc.insert(head, Document::new());
			}
			match doc.get_mut(head) {
				Some(Bson::Document(inner)) => set_path(inner, rest, value),
				Some(other) => Err(NoSQLError::InvalidOperation(format!(
					"Cannot create field '{}' in element {{{}: {}}}",
					rest, head, other
				))),
				None => Ok(()),
			}
		}
	}
}

/// Remove the value at `path`, returning it.
pub(crate) fn remove_path(doc: &mut Document, path: &str) -> Option<Bson> {
	match path.split_once('.') {
		None => doc.remove(path),
		Some((head, rest)) => match doc.get_mut(head)? {
			Bson::Document(inner) => remove_path(inner, rest),
			_ => None,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;

	#[test]
	fn test_lookup_nested_and_indexed() {
		let doc = doc! {
			"title": "The Hobbit",
			"details": { "pages": 310, "formats": ["hardcover", "ebook"] },
		};

		assert_eq!(lookup(&doc, "title"), Some(&Bson::String("The Hobbit".into())));
		assert_eq!(lookup(&doc, "details.pages"), Some(&Bson::Int32(310)));
		assert_eq!(
			lookup(&doc, "details.formats.1"),
			Some(&Bson::String("ebook".into()))
		);
		assert_eq!(lookup(&doc, "details.isbn"), None);
		assert_eq!(lookup(&doc, "title.length"), None);
	}

	#[test]
	fn test_set_path_creates_parents() {
		let mut doc = doc! { "title": "1984" };
		set_path(&mut doc, "stats.sold", Bson::Int32(3)).unwrap();
		assert_eq!(doc, doc! { "title": "1984", "stats": { "sold": 3 } });
	}

	#[test]
	fn test_set_path_through_scalar_fails() {
		let mut doc = doc! { "title": "1984" };
		let err = set_path(&mut doc, "title.first", Bson::Int32(1)).unwrap_err();
		assert!(matches!(err, NoSQLError::InvalidOperation(_)));
	}

	#[test]
	fn test_remove_path() {
		let mut doc = doc! { "a": { "b": 1, "c": 2 } };
		assert_eq!(remove_path(&mut doc, "a.b"), Some(Bson::Int32(1)));
		assert_eq!(remove_path(&mut doc, "a.z"), None);
		assert_eq!(doc, doc! { "a": { "c": 2 } });
	}
}
