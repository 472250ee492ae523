//! Aggregation pipeline evaluation
//!
//! Stages: `$match`, `$group`, `$sort`, `$limit`, `$skip`, `$project`,
//! `$addFields` (alias `$set`) and `$count`.
//!
//! Expressions: field paths (`"$price"`), literals, nested documents and
//! arrays, plus `$add $subtract $multiply $divide $floor $ceil $toLower
//! $toUpper $concat $literal`.
//!
//! Accumulators: `$sum $avg $min $max $push $addToSet $first $last $count`.

use bson::{Bson, Document, doc};
use std::cmp::Ordering;

use super::compare::{as_f64, compare, values_equal};
use super::cursor::{project, sort_documents};
use super::filter::matches;
use super::path::{lookup, set_path};
use crate::error::{NoSQLError, Result};

/// Run `pipeline` over `docs`, one stage after another.
pub(crate) fn run_pipeline(mut docs: Vec<Document>, pipeline: &[Document]) -> Result<Vec<Document>> {
	for stage in pipeline {
		let mut entries = stage.iter();
		let (name, spec) = match (entries.next(), entries.next()) {
			(Some(entry), None) => entry,
			_ => {
				return Err(NoSQLError::InvalidOperation(
					"a pipeline stage must contain exactly one field".to_string(),
				));
			}
		};

		docs = match name.as_str() {
			"$match" => {
				let filter = stage_document(name, spec)?;
				let mut kept = Vec::with_capacity(docs.len());
				for doc in docs {
					if matches(&doc, filter)? {
						kept.push(doc);
					}
				}
				kept
			}
			"$group" => group(docs, stage_document(name, spec)?)?,
			"$sort" => {
				let spec = stage_document(name, spec)?;
				if spec.is_empty() {
					return Err(NoSQLError::InvalidOperation(
						"$sort needs at least one sort key".to_string(),
					));
				}
				sort_documents(&mut docs, spec)?;
				docs
			}
			"$limit" => {
				let limit = stage_count(name, spec)?;
				if limit == 0 {
					return Err(NoSQLError::InvalidOperation(
						"$limit must be positive".to_string(),
					));
				}
				docs.truncate(limit);
				docs
			}
			"$skip" => {
				let skip = stage_count(name, spec)?;
				docs.into_iter().skip(skip).collect()
			}
			"$project" => {
				let spec = stage_document(name, spec)?;
				docs.into_iter()
					.map(|doc| project_stage(doc, spec))
					.collect::<Result<_>>()?
			}
			"$addFields" | "$set" => {
				let spec = stage_document(name, spec)?;
				docs.into_iter()
					.map(|doc| add_fields(doc, spec))
					.collect::<Result<_>>()?
			}
			"$count" => {
				let field = spec.as_str().filter(|f| !f.is_empty() && !f.starts_with('$'));
				let field = field.ok_or_else(|| {
					NoSQLError::InvalidOperation(
						"$count needs a non-empty field name not starting with '$'".to_string(),
					)
				})?;
				if docs.is_empty() {
					Vec::new()
				} else {
					let mut counted = Document::new();
					counted.insert(field, count_bson(docs.len()));
					vec![counted]
				}
			}
			other => {
				return Err(NoSQLError::UnsupportedFeature(format!(
					"aggregation stage {}",
					other
				)));
			}
		};
	}
	Ok(docs)
}

fn stage_document<'a>(name: &str, spec: &'a Bson) -> Result<&'a Document> {
	spec.as_document().ok_or_else(|| {
		NoSQLError::InvalidOperation(format!("{} needs a document, got {}", name, spec))
	})
}

fn stage_count(name: &str, spec: &Bson) -> Result<usize> {
	let value = match spec {
		Bson::Int32(n) => *n as i64,
		Bson::Int64(n) => *n,
		Bson::Double(f) if f.fract() == 0.0 => *f as i64,
		_ => -1,
	};
	usize::try_from(value).map_err(|_| {
		NoSQLError::InvalidOperation(format!("{} needs a non-negative integer, got {}", name, spec))
	})
}

fn count_bson(n: usize) -> Bson {
	match i32::try_from(n) {
		Ok(n) => Bson::Int32(n),
		Err(_) => Bson::Int64(n as i64),
	}
}

fn group(docs: Vec<Document>, spec: &Document) -> Result<Vec<Document>> {
	let id_expr = spec.get("_id").ok_or_else(|| {
		NoSQLError::InvalidOperation("a group specification must include an _id".to_string())
	})?;

	let mut accumulators = Vec::new();
	for (field, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
		let acc = acc.as_document().filter(|d| d.len() == 1).ok_or_else(|| {
			NoSQLError::InvalidOperation(format!(
				"the field '{}' must be an accumulator object",
				field
			))
		})?;
		if let Some((op, arg)) = acc.iter().next() {
			accumulators.push((field.as_str(), op.as_str(), arg));
		}
	}

	// groups keep first-seen order
	let mut groups: Vec<(Bson, Vec<Document>)> = Vec::new();
	for doc in docs {
		let key = evaluate(id_expr, &doc)?;
		match groups.iter_mut().find(|(k, _)| values_equal(k, &key)) {
			Some((_, members)) => members.push(doc),
			None => groups.push((key, vec![doc])),
		}
	}

	groups
		.into_iter()
		.map(|(key, members)| {
			let mut out = doc! { "_id": key };
			for (field, op, arg) in &accumulators {
				out.insert(*field, accumulate(op, arg, &members)?);
			}
			Ok(out)
		})
		.collect()
}

fn accumulate(op: &str, arg: &Bson, members: &[Document]) -> Result<Bson> {
	let values = || -> Result<Vec<Bson>> {
		members.iter().map(|doc| evaluate(arg, doc)).collect()
	};

	Ok(match op {
		"$sum" => sum(&values()?),
		"$avg" => {
			let numbers: Vec<f64> = values()?.iter().filter_map(as_f64).collect();
			if numbers.is_empty() {
				Bson::Null
			} else {
				Bson::Double(numbers.iter().sum::<f64>() / numbers.len() as f64)
			}
		}
		"$min" | "$max" => {
			let wanted = if op == "$min" { Ordering::Less } else { Ordering::Greater };
			values()?
				.into_iter()
				.filter(|v| !matches!(v, Bson::Null | Bson::Undefined))
				.reduce(|best, v| if compare(&v, &best) == wanted { v } else { best })
				.unwrap_or(Bson::Null)
		}
		"$push" => Bson::Array(values()?),
		"$addToSet" => {
			let mut set: Vec<Bson> = Vec::new();
			for value in values()? {
				if !set.iter().any(|seen| values_equal(seen, &value)) {
					set.push(value);
				}
			}
			Bson::Array(set)
		}
		"$first" => match members.first() {
			Some(doc) => evaluate(arg, doc)?,
			None => Bson::Null,
		},
		"$last" => match members.last() {
			Some(doc) => evaluate(arg, doc)?,
			None => Bson::Null,
		},
		"$count" => count_bson(members.len()),
		other => {
			return Err(NoSQLError::UnsupportedFeature(format!(
				"group accumulator {}",
				other
			)));
		}
	})
}

/// `$sum` ignores non-numeric values. Integer sums stay integral, widening to
/// `Int64` on overflow; any double makes the result a double.
fn sum(values: &[Bson]) -> Bson {
	let mut int_total: i64 = 0;
	let mut float_total = 0.0;
	let mut saw_double = false;
	let mut overflowed = false;

	for value in values {
		match value {
			Bson::Int32(n) => int_total = add_int(int_total, *n as i64, &mut overflowed),
			Bson::Int64(n) => int_total = add_int(int_total, *n, &mut overflowed),
			Bson::Double(f) => {
				saw_double = true;
				float_total += f;
			}
			_ => {}
		}
	}

	if saw_double || overflowed {
		return Bson::Double(int_total as f64 + float_total);
	}
	match i32::try_from(int_total) {
		Ok(n) => Bson::Int32(n),
		Err(_) => Bson::Int64(int_total),
	}
}

fn add_int(total: i64, n: i64, overflowed: &mut bool) -> i64 {
	total.checked_add(n).unwrap_or_else(|| {
		*overflowed = true;
		total.saturating_add(n)
	})
}

fn project_stage(doc: Document, spec: &Document) -> Result<Document> {
	let computed: Vec<(&String, &Bson)> = spec
		.iter()
		.filter(|(_, v)| !matches!(v, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)))
		.collect();
	if computed.is_empty() {
		return project(doc, spec);
	}

	let mut flags = Document::new();
	for (field, value) in spec {
		if !computed.iter().any(|(k, _)| *k == field) {
			flags.insert(field.clone(), value.clone());
		}
	}
	let excludes_fields = flags
		.iter()
		.any(|(k, v)| k != "_id" && (matches!(v, Bson::Boolean(false)) || as_f64(v) == Some(0.0)));
	if excludes_fields {
		return Err(NoSQLError::InvalidOperation(
			"cannot mix computed fields with exclusions in $project".to_string(),
		));
	}

	let mut out = if flags.keys().any(|k| k != "_id") {
		project(doc.clone(), &flags)?
	} else {
		let mut base = Document::new();
		let keep_id = flags.get("_id").is_none_or(|v| {
			!matches!(v, Bson::Boolean(false)) && as_f64(v) != Some(0.0)
		});
		if keep_id && let Some(id) = doc.get("_id") {
			base.insert("_id", id.clone());
		}
		base
	};
	for (field, expr) in computed {
		set_path(&mut out, field, evaluate(expr, &doc)?)?;
	}
	Ok(out)
}

fn add_fields(doc: Document, spec: &Document) -> Result<Document> {
	let mut out = doc.clone();
	for (field, expr) in spec {
		set_path(&mut out, field, evaluate(expr, &doc)?)?;
	}
	Ok(out)
}

/// Evaluate an aggregation expression against one document.
///
/// A missing field path evaluates to `null`.
pub(crate) fn evaluate(expr: &Bson, doc: &Document) -> Result<Bson> {
	match expr {
		Bson::String(s) if s == "$$ROOT" || s == "$$CURRENT" => Ok(Bson::Document(doc.clone())),
		Bson::String(s) if s.starts_with("$$") => Err(NoSQLError::UnsupportedFeature(format!(
			"aggregation variable {}",
			s
		))),
		Bson::String(s) if s.starts_with('$') => {
			Ok(lookup(doc, &s[1..]).cloned().unwrap_or(Bson::Null))
		}
		Bson::Document(d) => {
			let mut entries = d.iter();
			if let (Some((op, arg)), None) = (entries.next(), entries.next())
				&& op.starts_with('$')
			{
				return operator(op, arg, doc);
			}
			let mut out = Document::new();
			for (key, value) in d {
				if key.starts_with('$') {
					return Err(NoSQLError::InvalidOperation(format!(
						"an expression object with several fields cannot hold operator {}",
						key
					)));
				}
				out.insert(key.clone(), evaluate(value, doc)?);
			}
			Ok(Bson::Document(out))
		}
		Bson::Array(items) => items
			.iter()
			.map(|item| evaluate(item, doc))
			.collect::<Result<Vec<_>>>()
			.map(Bson::Array),
		other => Ok(other.clone()),
	}
}

fn arguments(arg: &Bson, doc: &Document) -> Result<Vec<Bson>> {
	match arg {
		Bson::Array(items) => items.iter().map(|item| evaluate(item, doc)).collect(),
		single => Ok(vec![evaluate(single, doc)?]),
	}
}

fn exactly<const N: usize>(op: &str, args: Vec<Bson>) -> Result<[Bson; N]> {
	let len = args.len();
	args.try_into().map_err(|_| {
		NoSQLError::InvalidOperation(format!(
			"{} takes exactly {} argument(s), {} given",
			op, N, len
		))
	})
}

enum Number {
	Int(i64),
	Float(f64),
}

impl Number {
	fn as_f64(&self) -> f64 {
		match self {
			Number::Int(n) => *n as f64,
			Number::Float(f) => *f,
		}
	}
}

fn into_bson(n: Number) -> Bson {
	match n {
		Number::Int(n) => match i32::try_from(n) {
			Ok(small) => Bson::Int32(small),
			Err(_) => Bson::Int64(n),
		},
		Number::Float(f) => Bson::Double(f),
	}
}

/// Numeric operands, or `None` when any operand is null or missing.
fn numbers(op: &str, args: &[Bson]) -> Result<Option<Vec<Number>>> {
	let mut out = Vec::with_capacity(args.len());
	for arg in args {
		out.push(match arg {
			Bson::Null | Bson::Undefined => return Ok(None),
			Bson::Int32(n) => Number::Int(*n as i64),
			Bson::Int64(n) => Number::Int(*n),
			Bson::Double(f) => Number::Float(*f),
			other => {
				return Err(NoSQLError::ExecutionError(format!(
					"{} only supports numeric types, not {}",
					op,
					type_name(other)
				)));
			}
		});
	}
	Ok(Some(out))
}

fn fold(values: Vec<Number>, int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> Number {
	let mut values = values.into_iter();
	let Some(mut acc) = values.next() else {
		return Number::Int(0);
	};
	for value in values {
		acc = match (acc, value) {
			(Number::Int(a), Number::Int(b)) => match int_op(a, b) {
				Some(n) => Number::Int(n),
				None => Number::Float(float_op(a as f64, b as f64)),
			},
			(a, b) => Number::Float(float_op(a.as_f64(), b.as_f64())),
		};
	}
	acc
}

fn operator(op: &str, arg: &Bson, doc: &Document) -> Result<Bson> {
	if op == "$literal" {
		return Ok(arg.clone());
	}
	let args = arguments(arg, doc)?;

	Ok(match op {
		"$add" => match numbers(op, &args)? {
			Some(ns) => into_bson(fold(ns, i64::checked_add, |a, b| a + b)),
			None => Bson::Null,
		},
		"$multiply" => match numbers(op, &args)? {
			Some(ns) if ns.is_empty() => Bson::Int32(1),
			Some(ns) => into_bson(fold(ns, i64::checked_mul, |a, b| a * b)),
			None => Bson::Null,
		},
		"$subtract" => match numbers(op, &exactly::<2>(op, args)?)? {
			Some(ns) => into_bson(fold(ns, i64::checked_sub, |a, b| a - b)),
			None => Bson::Null,
		},
		"$divide" => match numbers(op, &exactly::<2>(op, args)?)? {
			Some(ns) => {
				let (dividend, divisor) = (ns[0].as_f64(), ns[1].as_f64());
				if divisor == 0.0 {
					return Err(NoSQLError::ExecutionError("can't $divide by zero".to_string()));
				}
				Bson::Double(dividend / divisor)
			}
			None => Bson::Null,
		},
		"$floor" | "$ceil" => {
			let [value] = exactly::<1>(op, args)?;
			match numbers(op, &[value])?.and_then(|mut ns| ns.pop()) {
				Some(Number::Int(n)) => into_bson(Number::Int(n)),
				Some(Number::Float(f)) => {
					Bson::Double(if op == "$floor" { f.floor() } else { f.ceil() })
				}
				None => Bson::Null,
			}
		}
		"$toLower" | "$toUpper" => {
			let [value] = exactly::<1>(op, args)?;
			let text = match value {
				Bson::String(s) => s,
				Bson::Null | Bson::Undefined => String::new(),
				Bson::Int32(n) => n.to_string(),
				Bson::Int64(n) => n.to_string(),
				Bson::Double(f) => f.to_string(),
				other => {
					return Err(NoSQLError::ExecutionError(format!(
						"{} can't convert {} to a string",
						op,
						type_name(&other)
					)));
				}
			};
			Bson::String(if op == "$toLower" { text.to_lowercase() } else { text.to_uppercase() })
		}
		"$concat" => {
			let mut out = String::new();
			for value in args {
				match value {
					Bson::String(s) => out.push_str(&s),
					Bson::Null | Bson::Undefined => return Ok(Bson::Null),
					other => {
						return Err(NoSQLError::ExecutionError(format!(
							"$concat only supports strings, not {}",
							type_name(&other)
						)));
					}
				}
			}
			Bson::String(out)
		}
		other => {
			return Err(NoSQLError::UnsupportedFeature(format!(
				"expression operator {}",
				other
			)));
		}
	})
}

fn type_name(value: &Bson) -> &'static str {
	match value {
		Bson::Double(_) => "double",
		Bson::String(_) => "string",
		Bson::Document(_) => "object",
		Bson::Array(_) => "array",
		Bson::Boolean(_) => "bool",
		Bson::Null => "null",
		Bson::Int32(_) => "int",
		Bson::Int64(_) => "long",
		Bson::ObjectId(_) => "objectId",
		Bson::DateTime(_) => "date",
		_ => "other",
	}
}
