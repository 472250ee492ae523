//! Reading `explain` command output

use bson::{Bson, Document};

use crate::error::{NoSQLError, Result};
use crate::types::ExplainStats;

/// Extract [`ExplainStats`] from an `explain` response run with
/// `verbosity: "executionStats"`.
///
/// The returned count is read from `nReturned`, falling back to
/// `totalDocsReturned`. The index name is the first `indexName` found while
/// walking `executionStages` through `inputStage` / `inputStages`.
pub fn parse_execution_stats(response: &Document) -> Result<ExplainStats> {
	let stats = response.get_document("executionStats").map_err(|_| {
		NoSQLError::ExecutionError("explain response has no executionStats".to_string())
	})?;

	let stages = stats.get_document("executionStages").ok();

	Ok(ExplainStats {
		stage: stages
			.and_then(|s| s.get_str("stage").ok())
			.unwrap_or_default()
			.to_string(),
		docs_examined: count(stats.get("totalDocsExamined")),
		docs_returned: count(stats.get("nReturned").or_else(|| stats.get("totalDocsReturned"))),
		execution_time_millis: count(stats.get("executionTimeMillis")),
		index_name: stages.and_then(find_index_name),
	})
}

fn count(value: Option<&Bson>) -> u64 {
	match value {
		Some(Bson::Int32(n)) => (*n).max(0) as u64,
		Some(Bson::Int64(n)) => (*n).max(0) as u64,
		Some(Bson::Double(f)) if *f > 0.0 => *f as u64,
		_ => 0,
	}
}

fn find_index_name(stage: &Document) -> Option<String> {
	if let Ok(name) = stage.get_str("indexName") {
		return Some(name.to_string());
	}
	if let Ok(input) = stage.get_document("inputStage")
		&& let Some(name) = find_index_name(input)
	{
		return Some(name);
	}
	stage
		.get_array("inputStages")
		.ok()?
		.iter()
		.filter_map(Bson::as_document)
		.find_map(find_index_name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;

	#[test]
	fn test_index_scan_response() {
		let response = doc! {
			"queryPlanner": { "namespace": "plp_bookstore.books" },
			"executionStats": {
				"executionSuccess": true,
				"nReturned": 1,
				"executionTimeMillis": 3,
				"totalKeysExamined": 1,
				"totalDocsExamined": 1,
				"executionStages": {
					"stage": "FETCH",
					"nReturned": 1,
					"inputStage": {
						"stage": "IXSCAN",
						"indexName": "title_1",
					},
				},
			},
			"ok": 1.0,
		};

		let stats = parse_execution_stats(&response).unwrap();

		assert_eq!(stats.stage, "FETCH");
		assert_eq!(stats.docs_examined, 1);
		assert_eq!(stats.docs_returned, 1);
		assert_eq!(stats.execution_time_millis, 3);
		assert_eq!(stats.index_name.as_deref(), Some("title_1"));
	}

	#[test]
	fn test_collection_scan_response() {
		let response = doc! {
			"executionStats": {
				"nReturned": 2_i64,
				"executionTimeMillis": 0,
				"totalDocsExamined": 10_i64,
				"executionStages": { "stage": "COLLSCAN" },
			},
		};

		let stats = parse_execution_stats(&response).unwrap();

		assert_eq!(stats.stage, "COLLSCAN");
		assert_eq!(stats.docs_examined, 10);
		assert_eq!(stats.docs_returned, 2);
		assert_eq!(stats.index_name, None);
	}

	#[test]
	fn test_index_name_inside_input_stages() {
		let response = doc! {
			"executionStats": {
				"totalDocsReturned": 4,
				"totalDocsExamined": 4,
				"executionTimeMillis": 1,
				"executionStages": {
					"stage": "SORT_MERGE",
					"inputStages": [
						{ "stage": "SORT" },
						{ "stage": "FETCH", "inputStage": { "stage": "IXSCAN", "indexName": "author_1_published_year_-1" } },
					],
				},
			},
		};

		let stats = parse_execution_stats(&response).unwrap();

		assert_eq!(stats.docs_returned, 4);
		assert_eq!(stats.index_name.as_deref(), Some("author_1_published_year_-1"));
	}

	#[test]
	fn test_missing_execution_stats_is_an_error() {
		let err = parse_execution_stats(&doc! { "ok": 1.0 }).unwrap_err();
		assert!(matches!(err, NoSQLError::ExecutionError(_)));
	}
}
