//! Query filter evaluation
//!
//! Supports implicit equality (including array membership and regex
//! literals), the comparison operators `$eq $ne $gt $gte $lt $lte $in $nin`,
//! `$exists`, `$regex`/`$options`, `$not`, and the logical operators
//! `$and $or $nor`.

use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

use super::compare::{compare, type_rank, values_equal};
use super::path::lookup;
use crate::error::{NoSQLError, Result};

/// Whether `doc` satisfies `filter`. An empty filter matches everything.
pub(crate) fn matches(doc: &Document, filter: &Document) -> Result<bool> {
	for (key, condition) in filter {
		let ok = match key.as_str() {
			"$and" => {
				let clauses = clauses(key, condition)?;
				let mut all = true;
				for clause in clauses {
					if !matches(doc, clause)? {
						all = false;
						break;
					}
				}
				all
			}
			"$or" => any_clause(doc, clauses(key, condition)?)?,
			"$nor" => !any_clause(doc, clauses(key, condition)?)?,
			op if op.starts_with('$') => {
				return Err(NoSQLError::InvalidOperation(format!(
					"unknown top level operator: {}",
					op
				)));
			}
			field => matches_field(lookup(doc, field), condition)?,
		};
		if !ok {
			return Ok(false);
		}
	}
	Ok(true)
}

fn clauses<'a>(operator: &str, condition: &'a Bson) -> Result<Vec<&'a Document>> {
	let invalid = || {
		NoSQLError::InvalidOperation(format!("{} must be a nonempty array of documents", operator))
	};
	let items = condition.as_array().ok_or_else(invalid)?;
	if items.is_empty() {
		return Err(invalid());
	}
	items
		.iter()
		.map(|item| item.as_document().ok_or_else(invalid))
		.collect()
}

fn any_clause(doc: &Document, clauses: Vec<&Document>) -> Result<bool> {
	for clause in clauses {
		if matches(doc, clause)? {
			return Ok(true);
		}
	}
	Ok(false)
}

/// Whether `condition` is an operator document such as `{ $gt: 5 }`.
pub(crate) fn is_operator_document(condition: &Bson) -> bool {
	match condition {
		Bson::Document(d) => d.keys().next().is_some_and(|k| k.starts_with('$')),
		_ => false,
	}
}

/// Evaluate the condition for one field. `value` is `None` when the field is missing.
pub(crate) fn matches_field(value: Option<&Bson>, condition: &Bson) -> Result<bool> {
	let operators = match condition {
		Bson::Document(d) if is_operator_document(condition) => d,
		_ => return equals(value, condition),
	};

	let regex_options = operators.get_str("$options").ok();

	for (operator, argument) in operators {
		let ok = match operator.as_str() {
			"$eq" => equals(value, argument)?,
			"$ne" => !equals(value, argument)?,
			"$gt" => in_range(value, argument, |o| o == Ordering::Greater),
			"$gte" => in_range(value, argument, |o| o != Ordering::Less),
			"$lt" => in_range(value, argument, |o| o == Ordering::Less),
			"$lte" => in_range(value, argument, |o| o != Ordering::Greater),
			"$in" => any_equal(value, operator, argument)?,
			"$nin" => !any_equal(value, operator, argument)?,
			"$exists" => truthy(argument) == value.is_some(),
			"$regex" => {
				let regex = compile(argument, regex_options)?;
				regex_matches(value, &regex)
			}
			"$options" => {
				if !operators.contains_key("$regex") {
					return Err(NoSQLError::InvalidOperation(
						"$options needs a $regex".to_string(),
					));
				}
				true
			}
			"$not" => match argument {
				Bson::Document(_) | Bson::RegularExpression(_) => !matches_field(value, argument)?,
				_ => {
					return Err(NoSQLError::InvalidOperation(
						"$not needs a regex or a document".to_string(),
					));
				}
			},
			other if other.starts_with('$') => {
				return Err(NoSQLError::InvalidOperation(format!(
					"unknown operator: {}",
					other
				)));
			}
			other => {
				return Err(NoSQLError::InvalidOperation(format!(
					"cannot mix field '{}' with query operators",
					other
				)));
			}
		};
		if !ok {
			return Ok(false);
		}
	}
	Ok(true)
}

/// Implicit equality. Arrays match when any element matches, a missing field
/// matches `null`, and a regex literal tests string values.
fn equals(value: Option<&Bson>, target: &Bson) -> Result<bool> {
	if let Bson::RegularExpression(re) = target {
		let regex = compile_pattern(&re.pattern, &re.options)?;
		return Ok(regex_matches(value, &regex));
	}
	Ok(match value {
		None => matches!(target, Bson::Null),
		Some(v) => {
			values_equal(v, target)
				|| matches!(v, Bson::Array(items) if items.iter().any(|item| values_equal(item, target)))
		}
	})
}

fn any_equal(value: Option<&Bson>, operator: &str, argument: &Bson) -> Result<bool> {
	let candidates = argument
		.as_array()
		.ok_or_else(|| NoSQLError::InvalidOperation(format!("{} needs an array", operator)))?;
	for candidate in candidates {
		if equals(value, candidate)? {
			return Ok(true);
		}
	}
	Ok(false)
}

/// Range comparisons only match values in the same type bracket as the bound.
fn in_range(value: Option<&Bson>, bound: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
	let check = |v: &Bson| type_rank(v) == type_rank(bound) && accept(compare(v, bound));
	match value {
		None => false,
		Some(Bson::Array(items)) if !matches!(bound, Bson::Array(_)) => items.iter().any(check),
		Some(v) => check(v),
	}
}

fn truthy(value: &Bson) -> bool {
	match value {
		Bson::Boolean(b) => *b,
		Bson::Int32(n) => *n != 0,
		Bson::Int64(n) => *n != 0,
		Bson::Double(f) => *f != 0.0,
		Bson::Null | Bson::Undefined => false,
		_ => true,
	}
}

fn compile(argument: &Bson, options: Option<&str>) -> Result<Regex> {
	match argument {
		Bson::String(pattern) => compile_pattern(pattern, options.unwrap_or_default()),
		Bson::RegularExpression(re) => {
			compile_pattern(&re.pattern, options.unwrap_or(re.options.as_str()))
		}
		other => Err(NoSQLError::InvalidOperation(format!(
			"$regex has to be a string, got {}",
			other
		))),
	}
}

pub(crate) fn compile_pattern(pattern: &str, options: &str) -> Result<Regex> {
	let mut builder = RegexBuilder::new(pattern);
	for flag in options.chars() {
		match flag {
			'i' => builder.case_insensitive(true),
			'm' => builder.multi_line(true),
			's' => builder.dot_matches_new_line(true),
			'x' => builder.ignore_whitespace(true),
			other => {
				return Err(NoSQLError::InvalidOperation(format!(
					"invalid regex flag '{}'",
					other
				)));
			}
		};
	}
	builder
		.build()
		.map_err(|e| NoSQLError::InvalidOperation(format!("invalid regex: {}", e)))
}

fn regex_matches(value: Option<&Bson>, regex: &Regex) -> bool {
	match value {
		Some(Bson::String(s)) => regex.is_match(s),
		Some(Bson::Array(items)) => items
			.iter()
			.any(|item| matches!(item, Bson::String(s) if regex.is_match(s))),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::{fixture, rstest};

	#[fixture]
	fn book() -> Document {
		doc! {
			"title": "The Road",
			"author": "Cormac McCarthy",
			"genre": "Post-apocalyptic",
			"published_year": 2006,
			"price": 13.49,
			"pages": 287,
			"in_stock": true,
			"tags": ["bleak", "award"],
		}
	}

	#[rstest]
	#[case(doc! {}, true)]
	#[case(doc! { "genre": "Post-apocalyptic" }, true)]
	#[case(doc! { "genre": "Fiction" }, false)]
	#[case(doc! { "published_year": { "$gt": 2000 } }, true)]
	#[case(doc! { "published_year": { "$gte": 1800, "$lte": 1950 } }, false)]
	#[case(doc! { "pages": { "$gt": 300 } }, false)]
	#[case(doc! { "price": { "$lt": 14 } }, true)]
	#[case(doc! { "in_stock": true, "published_year": { "$gt": 2010 } }, false)]
	#[case(doc! { "title": { "$regex": "the", "$options": "i" } }, true)]
	#[case(doc! { "title": { "$regex": "the" } }, false)]
	#[case(doc! { "tags": "award" }, true)]
	#[case(doc! { "tags": { "$in": ["classic", "bleak"] } }, true)]
	#[case(doc! { "genre": { "$nin": ["Fiction", "Fantasy"] } }, true)]
	#[case(doc! { "isbn": { "$exists": false } }, true)]
	#[case(doc! { "isbn": null }, true)]
	#[case(doc! { "author": { "$ne": "Cormac McCarthy" } }, false)]
	#[case(doc! { "$or": [{ "genre": "Fiction" }, { "pages": { "$lt": 300 } }] }, true)]
	#[case(doc! { "$nor": [{ "genre": "Fiction" }] }, true)]
	#[case(doc! { "$and": [{ "in_stock": true }, { "price": { "$gte": 20 } }] }, false)]
	#[case(doc! { "title": { "$not": { "$regex": "^The" } } }, false)]
	fn test_matches(book: Document, #[case] filter: Document, #[case] expected: bool) {
		assert_eq!(matches(&book, &filter).unwrap(), expected, "filter: {}", filter);
	}

	#[rstest]
	fn test_range_does_not_cross_types(book: Document) {
		// a string is never "greater than" a number
		assert!(!matches(&book, &doc! { "title": { "$gt": 5 } }).unwrap());
	}

	#[rstest]
	fn test_regex_literal(book: Document) {
		let filter = doc! { "title": Bson::RegularExpression(bson::Regex {
			pattern: "road$".to_string(),
			options: "i".to_string(),
		}) };
		assert!(matches(&book, &filter).unwrap());
	}

	#[rstest]
	#[case(doc! { "$where": "this.pages > 1" })]
	#[case(doc! { "pages": { "$between": [1, 2] } })]
	#[case(doc! { "$or": [] })]
	#[case(doc! { "genre": { "$in": "Fiction" } })]
	#[case(doc! { "title": { "$regex": "x", "$options": "q" } })]
	#[case(doc! { "title": { "$options": "i" } })]
	fn test_invalid_filters(book: Document, #[case] filter: Document) {
		let err = matches(&book, &filter).unwrap_err();
		assert!(matches!(err, NoSQLError::InvalidOperation(_)), "{:?}", err);
	}
}
