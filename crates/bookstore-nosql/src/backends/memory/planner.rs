//! Index selection and execution statistics for `explain`

use bson::{Bson, Document};
use std::time::Instant;

use super::filter::{matches, matches_field};
use super::path::lookup;
use crate::error::Result;
use crate::types::{ExplainStats, IndexModel};

/// Operators an index scan can turn into key bounds.
const BOUNDING_OPERATORS: &[&str] = &["$eq", "$gt", "$gte", "$lt", "$lte", "$in"];

/// Field conditions usable as index bounds: top-level fields plus the
/// branches of a top-level `$and`.
fn bounded_conditions(filter: &Document) -> Vec<(&str, &Bson)> {
	let mut out = Vec::new();
	for (key, condition) in filter {
		if key == "$and" {
			if let Bson::Array(clauses) = condition {
				for clause in clauses.iter().filter_map(Bson::as_document) {
					out.extend(bounded_conditions(clause));
				}
			}
			continue;
		}
		if key.starts_with('$') {
			continue;
		}
		let usable = match condition {
			Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
				ops.keys().all(|op| BOUNDING_OPERATORS.contains(&op.as_str()))
			}
			Bson::RegularExpression(_) => false,
			_ => true,
		};
		if usable {
			out.push((key.as_str(), condition));
		}
	}
	out
}

/// Pick the index whose leading key fields are covered by the most
/// conditions. Ties go to the index created first.
fn choose_index<'a>(
	indexes: &'a [IndexModel],
	conditions: &[(&str, &Bson)],
) -> Option<(&'a IndexModel, usize)> {
	let mut best: Option<(&IndexModel, usize)> = None;
	for index in indexes {
		let covered = index
			.fields()
			.take_while(|field| conditions.iter().any(|(f, _)| f == field))
			.count();
		if covered > 0 && best.is_none_or(|(_, n)| covered > n) {
			best = Some((index, covered));
		}
	}
	best
}

/// Simulate the winning plan for `find(filter)` over `docs`.
///
/// With a usable index, documents examined are those inside the bounds of the
/// covered key prefix; otherwise every document is examined.
pub(crate) fn explain(
	docs: &[Document],
	indexes: &[IndexModel],
	filter: &Document,
) -> Result<ExplainStats> {
	let started = Instant::now();
	let conditions = bounded_conditions(filter);

	let (stage, docs_examined, index_name) = match choose_index(indexes, &conditions) {
		Some((index, covered)) => {
			let prefix: Vec<&str> = index.fields().take(covered).collect();
			let mut examined = 0;
			for doc in docs {
				let mut inside = true;
				for (field, condition) in conditions.iter().filter(|(f, _)| prefix.contains(f)) {
					if !matches_field(lookup(doc, field), condition)? {
						inside = false;
						break;
					}
				}
				if inside {
					examined += 1;
				}
			}
			("FETCH", examined, Some(index.effective_name()))
		}
		None => ("COLLSCAN", docs.len() as u64, None),
	};

	let mut docs_returned = 0;
	for doc in docs {
		if matches(doc, filter)? {
			docs_returned += 1;
		}
	}

	Ok(ExplainStats {
		stage: stage.to_string(),
		docs_examined,
		docs_returned,
		execution_time_millis: started.elapsed().as_millis() as u64,
		index_name,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::{fixture, rstest};

	#[fixture]
	fn docs() -> Vec<Document> {
		vec![
			doc! { "title": "1984", "author": "George Orwell", "published_year": 1949 },
			doc! { "title": "Animal Farm", "author": "George Orwell", "published_year": 1945 },
			doc! { "title": "The Road", "author": "Cormac McCarthy", "published_year": 2006 },
		]
	}

	fn index(keys: Document) -> IndexModel {
		IndexModel::builder().keys(keys).build()
	}

	#[fixture]
	fn indexes() -> Vec<IndexModel> {
		vec![
			IndexModel::builder().keys(doc! { "_id": 1 }).name("_id_").unique(true).build(),
			index(doc! { "title": 1 }),
			index(doc! { "author": 1, "published_year": -1 }),
		]
	}

	#[rstest]
	fn test_equality_on_indexed_field(docs: Vec<Document>, indexes: Vec<IndexModel>) {
		let stats = explain(&docs, &indexes, &doc! { "title": "1984" }).unwrap();
		assert_eq!(stats.stage, "FETCH");
		assert_eq!(stats.index_name.as_deref(), Some("title_1"));
		assert_eq!(stats.docs_examined, 1);
		assert_eq!(stats.docs_returned, 1);
	}

	#[rstest]
	fn test_compound_prefix(docs: Vec<Document>, indexes: Vec<IndexModel>) {
		let filter = doc! { "author": "George Orwell", "published_year": { "$gt": 1940 } };
		let stats = explain(&docs, &indexes, &filter).unwrap();
		assert_eq!(
			stats.index_name.as_deref(),
			Some("author_1_published_year_-1")
		);
		assert_eq!(stats.docs_examined, 2);
		assert_eq!(stats.docs_returned, 2);
	}

	#[rstest]
	fn test_prefix_only_bounds_examined(docs: Vec<Document>, indexes: Vec<IndexModel>) {
		// published_year alone is not a prefix of the compound index
		let filter = doc! { "published_year": { "$gt": 1940 } };
		let stats = explain(&docs, &indexes, &filter).unwrap();
		assert_eq!(stats.stage, "COLLSCAN");
		assert_eq!(stats.index_name, None);
		assert_eq!(stats.docs_examined, 3);
		assert_eq!(stats.docs_returned, 3);
	}

	#[rstest]
	fn test_unbounded_operators_scan(docs: Vec<Document>, indexes: Vec<IndexModel>) {
		let filter = doc! { "title": { "$regex": "the", "$options": "i" } };
		let stats = explain(&docs, &indexes, &filter).unwrap();
		assert_eq!(stats.stage, "COLLSCAN");
		assert_eq!(stats.docs_returned, 1);
	}

	#[rstest]
	fn test_and_branches_are_bounds(docs: Vec<Document>, indexes: Vec<IndexModel>) {
		let filter = doc! { "$and": [{ "author": "George Orwell" }, { "title": "1984" }] };
		let stats = explain(&docs, &indexes, &filter).unwrap();
		// both indexes cover one field; the older one wins
		assert_eq!(stats.index_name.as_deref(), Some("title_1"));
		assert_eq!(stats.docs_examined, 1);
		assert_eq!(stats.docs_returned, 1);
	}
}
