//! Update operators: `$set`, `$unset`, `$inc`

use bson::{Bson, Document};

use super::path::{lookup, remove_path, set_path};
use crate::error::{NoSQLError, Result};

/// Apply an operator update in place. Returns whether the document changed.
pub(crate) fn apply_update(doc: &mut Document, update: &Document) -> Result<bool> {
	if update.is_empty() {
		return Err(NoSQLError::InvalidOperation(
			"update document must not be empty".to_string(),
		));
	}
	if let Some(key) = update.keys().find(|k| !k.starts_with('$')) {
		return Err(NoSQLError::InvalidOperation(format!(
			"update document requires atomic operators, found '{}'",
			key
		)));
	}

	let original = doc.clone();
	for (operator, fields) in update {
		let fields = fields.as_document().ok_or_else(|| {
			NoSQLError::InvalidOperation(format!(
				"modifier {} needs a document of fields, got {}",
				operator, fields
			))
		})?;

		for (path, value) in fields {
			if path == "_id" || path.starts_with("_id.") {
				guard_id(&original, operator, path, value)?;
			}
			match operator.as_str() {
				"$set" => set_path(doc, path, value.clone())?,
				"$unset" => {
					remove_path(doc, path);
				}
				"$inc" => increment(doc, path, value)?,
				other => {
					return Err(NoSQLError::InvalidOperation(format!(
						"unknown update modifier: {}",
						other
					)));
				}
			}
		}
	}
	Ok(*doc != original)
}

fn guard_id(original: &Document, operator: &str, path: &str, value: &Bson) -> Result<()> {
	let unchanged = operator == "$set" && lookup(original, path).is_some_and(|v| v == value);
	if unchanged {
		return Ok(());
	}
	Err(NoSQLError::InvalidOperation(
		"the field '_id' is immutable".to_string(),
	))
}

fn increment(doc: &mut Document, path: &str, amount: &Bson) -> Result<()> {
	let current = lookup(doc, path).cloned();
	let next = match current {
		None => amount.clone(),
		Some(current) => add(&current, amount).ok_or_else(|| {
			NoSQLError::InvalidOperation(format!(
				"cannot apply $inc of {} to non-numeric field '{}' ({})",
				amount, path, current
			))
		})?,
	};
	if !matches!(next, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
		return Err(NoSQLError::InvalidOperation(format!(
			"$inc needs a numeric amount, got {}",
			amount
		)));
	}
	set_path(doc, path, next)
}

fn add(a: &Bson, b: &Bson) -> Option<Bson> {
	Some(match (a, b) {
		(Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
			Some(sum) => Bson::Int32(sum),
			None => Bson::Int64(*x as i64 + *y as i64),
		},
		(Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
			Bson::Int64(int(a)?.checked_add(int(b)?)?)
		}
		(Bson::Double(x), _) => Bson::Double(x + float(b)?),
		(_, Bson::Double(y)) => Bson::Double(float(a)? + y),
		_ => return None,
	})
}

fn int(value: &Bson) -> Option<i64> {
	match value {
		Bson::Int32(n) => Some(*n as i64),
		Bson::Int64(n) => Some(*n),
		_ => None,
	}
}

fn float(value: &Bson) -> Option<f64> {
	super::compare::as_f64(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::{fixture, rstest};

	#[fixture]
	fn orwell() -> Document {
		doc! { "_id": 2, "title": "1984", "price": 10.0, "pages": 328 }
	}

	#[rstest]
	fn test_set_changes_value(mut orwell: Document) {
		let changed = apply_update(&mut orwell, &doc! { "$set": { "price": 13.99 } }).unwrap();
		assert!(changed);
		assert_eq!(orwell.get_f64("price").unwrap(), 13.99);
	}

	#[rstest]
	fn test_set_to_same_value_is_not_a_modification(mut orwell: Document) {
		let changed = apply_update(&mut orwell, &doc! { "$set": { "price": 10.0 } }).unwrap();
		assert!(!changed);
	}

	#[rstest]
	fn test_unset_and_inc(mut orwell: Document) {
		apply_update(
			&mut orwell,
			&doc! { "$unset": { "pages": "" }, "$inc": { "stock": 3, "price": 0.5 } },
		)
		.unwrap();
		assert_eq!(
			orwell,
			doc! { "_id": 2, "title": "1984", "price": 10.5, "stock": 3 }
		);
	}

	#[rstest]
	#[case(doc! {})]
	#[case(doc! { "price": 13.99 })]
	#[case(doc! { "$push": { "tags": "x" } })]
	#[case(doc! { "$set": 5 })]
	#[case(doc! { "$inc": { "title": 1 } })]
	#[case(doc! { "$inc": { "pages": "many" } })]
	#[case(doc! { "$set": { "_id": 99 } })]
	fn test_invalid_updates(mut orwell: Document, #[case] update: Document) {
		let err = apply_update(&mut orwell, &update).unwrap_err();
		assert!(matches!(err, NoSQLError::InvalidOperation(_)), "{:?}", err);
	}
}
