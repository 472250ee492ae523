//! BSON ordering and equality following MongoDB's comparison rules
//!
//! Values of different types order by canonical type bracket:
//! MinKey < Null < numbers < strings < documents < arrays < binary < ObjectId
//! < booleans < dates < timestamps < regular expressions < MaxKey.
//! Numbers compare by value regardless of their BSON width.

use bson::Bson;
use std::cmp::Ordering;

pub(crate) const NULL: Bson = Bson::Null;

pub(crate) fn type_rank(value: &Bson) -> u8 {
	match value {
		Bson::MinKey => 1,
		Bson::Null | Bson::Undefined => 2,
		Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 3,
		Bson::String(_) | Bson::Symbol(_) => 4,
		Bson::Document(_) => 5,
		Bson::Array(_) => 6,
		Bson::Binary(_) => 7,
		Bson::ObjectId(_) => 8,
		Bson::Boolean(_) => 9,
		Bson::DateTime(_) => 10,
		Bson::Timestamp(_) => 11,
		Bson::RegularExpression(_) => 12,
		Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) | Bson::DbPointer(_) => 13,
		Bson::MaxKey => 14,
	}
}

/// Numeric value of an `Int32`, `Int64` or `Double`.
pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
	match value {
		Bson::Int32(n) => Some(*n as f64),
		Bson::Int64(n) => Some(*n as f64),
		Bson::Double(f) => Some(*f),
		_ => None,
	}
}

fn as_i64(value: &Bson) -> Option<i64> {
	match value {
		Bson::Int32(n) => Some(*n as i64),
		Bson::Int64(n) => Some(*n),
		_ => None,
	}
}

/// Total order over BSON values.
pub(crate) fn compare(a: &Bson, b: &Bson) -> Ordering {
	let rank = type_rank(a).cmp(&type_rank(b));
	if rank != Ordering::Equal {
		return rank;
	}

	match (a, b) {
		_ if type_rank(a) == 3 => compare_numbers(a, b),
		(Bson::String(x), Bson::String(y)) => x.cmp(y),
		(Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
		(Bson::String(x), Bson::Symbol(y)) | (Bson::Symbol(x), Bson::String(y)) => x.cmp(y),
		(Bson::Document(x), Bson::Document(y)) => {
			for ((kx, vx), (ky, vy)) in x.iter().zip(y.iter()) {
				let ord = compare(vx, vy).then_with(|| kx.cmp(ky));
				if ord != Ordering::Equal {
					return ord;
				}
			}
			x.len().cmp(&y.len())
		}
		(Bson::Array(x), Bson::Array(y)) => {
			for (vx, vy) in x.iter().zip(y.iter()) {
				let ord = compare(vx, vy);
				if ord != Ordering::Equal {
					return ord;
				}
			}
			x.len().cmp(&y.len())
		}
		(Bson::Binary(x), Bson::Binary(y)) => x
			.bytes
			.len()
			.cmp(&y.bytes.len())
			.then_with(|| x.bytes.cmp(&y.bytes)),
		(Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
		(Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
		(Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
		(Bson::Timestamp(x), Bson::Timestamp(y)) => {
			x.time.cmp(&y.time).then_with(|| x.increment.cmp(&y.increment))
		}
		(Bson::RegularExpression(x), Bson::RegularExpression(y)) => x
			.pattern
			.cmp(&y.pattern)
			.then_with(|| x.options.cmp(&y.options)),
		_ => Ordering::Equal,
	}
}

fn compare_numbers(a: &Bson, b: &Bson) -> Ordering {
	if let (Some(x), Some(y)) = (as_i64(a), as_i64(b)) {
		return x.cmp(&y);
	}
	match (as_f64(a), as_f64(b)) {
		(Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| {
			// NaN sorts below every other number
			x.is_nan().cmp(&y.is_nan()).reverse()
		}),
		_ => Ordering::Equal,
	}
}

/// Query equality: same type bracket and equal value.
pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
	type_rank(a) == type_rank(b) && compare(a, b) == Ordering::Equal
}
