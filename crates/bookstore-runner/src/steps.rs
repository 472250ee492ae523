//! Step descriptors and the standard plan
//!
//! A plan is plain data: an ordered list of [`Step`]s, each carrying the
//! section it is reported under, a label, and the store [`Operation`] to run.
//! Nothing in a plan depends on the result of an earlier step.

use bookstore_nosql::{Document, FindOptions, IndexModel};
use bson::{Bson, Regex, doc};
use std::fmt;

/// Report section a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
	BasicCrud,
	AdvancedQueries,
	Aggregation,
	Indexing,
	Additional,
}

impl Section {
	/// Heading printed between `===` markers
	pub fn title(&self) -> &'static str {
		match self {
			Section::BasicCrud => "TASK 2: BASIC CRUD OPERATIONS",
			Section::AdvancedQueries => "TASK 3: ADVANCED QUERIES",
			Section::Aggregation => "TASK 4: AGGREGATION PIPELINE",
			Section::Indexing => "TASK 5: INDEXING",
			Section::Additional => "ADDITIONAL QUERY EXAMPLES",
		}
	}

	/// Line printed once under the heading, if any
	pub fn preamble(&self) -> Option<&'static str> {
		match self {
			Section::Additional => Some("Additional Query Examples:"),
			_ => None,
		}
	}

	/// Whether steps in this section are reported as `N. label:`
	pub fn is_numbered(&self) -> bool {
		!matches!(self, Section::Additional)
	}
}

impl fmt::Display for Section {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.title())
	}
}

/// How the documents returned by a find are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindView {
	/// Whole documents as returned by the store
	Documents,
	/// `{ title, price }` per document
	TitlePrice,
	/// Titles only
	Titles,
}

/// A single store call
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
	Find {
		filter: Document,
		options: FindOptions,
		view: FindView,
	},
	Count {
		filter: Document,
	},
	UpdateOne {
		filter: Document,
		update: Document,
	},
	DeleteOne {
		filter: Document,
	},
	Aggregate {
		pipeline: Vec<Document>,
	},
	CreateIndex {
		model: IndexModel,
	},
	Explain {
		filter: Document,
		/// Word used in `Execution stats for <subject> query:`
		subject: &'static str,
		/// Whether the winning plan's index is part of the report
		report_index: bool,
	},
	ListIndexes,
}

impl Operation {
	/// Short name of the store call
	pub fn kind(&self) -> &'static str {
		match self {
			Operation::Find { .. } => "find",
			Operation::Count { .. } => "count",
			Operation::UpdateOne { .. } => "update_one",
			Operation::DeleteOne { .. } => "delete_one",
			Operation::Aggregate { .. } => "aggregate",
			Operation::CreateIndex { .. } => "create_index",
			Operation::Explain { .. } => "explain",
			Operation::ListIndexes => "list_indexes",
		}
	}

	/// Whether the operation changes stored data or indexes
	pub fn is_write(&self) -> bool {
		matches!(
			self,
			Operation::UpdateOne { .. } | Operation::DeleteOne { .. } | Operation::CreateIndex { .. }
		)
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Find {
				filter, options, ..
			} => {
				write!(f, "find {}", filter)?;
				if let Some(projection) = &options.projection {
					write!(f, " projection {}", projection)?;
				}
				if let Some(sort) = &options.sort {
					write!(f, " sort {}", sort)?;
				}
				if let Some(skip) = options.skip {
					write!(f, " skip {}", skip)?;
				}
				if let Some(limit) = options.limit {
					write!(f, " limit {}", limit)?;
				}
				Ok(())
			}
			Operation::Count { filter } => write!(f, "count {}", filter),
			Operation::UpdateOne { filter, update } => {
				write!(f, "update_one {} {}", filter, update)
			}
			Operation::DeleteOne { filter } => write!(f, "delete_one {}", filter),
			Operation::Aggregate { pipeline } => {
				let stages: Vec<&str> = pipeline
					.iter()
					.filter_map(|stage| stage.keys().next().map(String::as_str))
					.collect();
				write!(f, "aggregate [{}]", stages.join(", "))
			}
			Operation::CreateIndex { model } => write!(f, "create_index {}", model.keys),
			Operation::Explain { filter, .. } => write!(f, "explain {}", filter),
			Operation::ListIndexes => f.write_str("list_indexes"),
		}
	}
}

/// One entry of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
	pub section: Section,
	pub label: &'static str,
	pub operation: Operation,
}

impl Step {
	pub fn new(section: Section, label: &'static str, operation: Operation) -> Self {
		Self {
			section,
			label,
			operation,
		}
	}
}

fn find(filter: Document, options: FindOptions, view: FindView) -> Operation {
	Operation::Find {
		filter,
		options,
		view,
	}
}

fn index(keys: Document) -> Operation {
	Operation::CreateIndex {
		model: IndexModel::builder().keys(keys).build(),
	}
}

/// The fixed sequence run against the books collection
pub fn standard_plan() -> Vec<Step> {
	use Section::*;

	let all = FindOptions::new;

	vec![
		Step::new(
			BasicCrud,
			"Books in Fiction genre",
			find(doc! { "genre": "Fiction" }, all(), FindView::Documents),
		),
		Step::new(
			BasicCrud,
			"Books published after 2000",
			find(
				doc! { "published_year": { "$gt": 2000 } },
				all(),
				FindView::Documents,
			),
		),
		Step::new(
			BasicCrud,
			"Books by George Orwell",
			find(doc! { "author": "George Orwell" }, all(), FindView::Documents),
		),
		Step::new(
			BasicCrud,
			"Updating price of \"1984\"",
			Operation::UpdateOne {
				filter: doc! { "title": "1984" },
				update: doc! { "$set": { "price": 13.99 } },
			},
		),
		Step::new(
			BasicCrud,
			"Attempting to delete \"Test Book\"",
			Operation::DeleteOne {
				filter: doc! { "title": "Test Book" },
			},
		),
		Step::new(
			AdvancedQueries,
			"Books in stock AND published after 2010",
			find(
				doc! { "$and": [
					{ "in_stock": true },
					{ "published_year": { "$gt": 2010 } },
				] },
				all(),
				FindView::Documents,
			),
		),
		Step::new(
			AdvancedQueries,
			"Books with projection (title, author, price only)",
			find(
				doc! {},
				all().projection(doc! { "title": 1, "author": 1, "price": 1, "_id": 0 }),
				FindView::Documents,
			),
		),
		Step::new(
			AdvancedQueries,
			"Books sorted by price (ascending)",
			find(doc! {}, all().sort(doc! { "price": 1 }), FindView::TitlePrice),
		),
		Step::new(
			AdvancedQueries,
			"Books sorted by price (descending)",
			find(doc! {}, all().sort(doc! { "price": -1 }), FindView::TitlePrice),
		),
		Step::new(
			AdvancedQueries,
			"Pagination - Page 1 (5 books)",
			find(doc! {}, all().limit(5), FindView::Titles),
		),
		Step::new(
			AdvancedQueries,
			"Pagination - Page 2 (5 books)",
			find(doc! {}, all().skip(5).limit(5), FindView::Titles),
		),
		Step::new(
			Aggregation,
			"Average price by genre",
			Operation::Aggregate {
				pipeline: vec![
					doc! { "$group": {
						"_id": "$genre",
						"averagePrice": { "$avg": "$price" },
						"count": { "$sum": 1 },
					} },
					doc! { "$sort": { "averagePrice": -1 } },
				],
			},
		),
		Step::new(
			Aggregation,
			"Author with most books",
			Operation::Aggregate {
				pipeline: vec![
					doc! { "$group": {
						"_id": "$author",
						"bookCount": { "$sum": 1 },
						"books": { "$push": "$title" },
					} },
					doc! { "$sort": { "bookCount": -1 } },
					doc! { "$limit": 1 },
				],
			},
		),
		Step::new(
			Aggregation,
			"Books grouped by publication decade",
			Operation::Aggregate {
				pipeline: vec![
					doc! { "$addFields": {
						"decade": { "$multiply": [
							{ "$floor": { "$divide": ["$published_year", 10] } },
							10,
						] },
					} },
					doc! { "$group": {
						"_id": "$decade",
						"count": { "$sum": 1 },
						"books": { "$push": { "title": "$title", "year": "$published_year" } },
					} },
					doc! { "$sort": { "_id": 1 } },
				],
			},
		),
		Step::new(
			Indexing,
			"Creating index on title field",
			index(doc! { "title": 1 }),
		),
		Step::new(
			Indexing,
			"Creating compound index on author and published_year",
			index(doc! { "author": 1, "published_year": -1 }),
		),
		Step::new(
			Indexing,
			"Query execution plan with index",
			Operation::Explain {
				filter: doc! { "title": "1984" },
				subject: "title",
				report_index: true,
			},
		),
		Step::new(
			Indexing,
			"Compound index usage",
			Operation::Explain {
				filter: doc! {
					"author": "George Orwell",
					"published_year": { "$gte": 1940 },
				},
				subject: "compound",
				report_index: false,
			},
		),
		Step::new(
			Indexing,
			"All indexes in the collection",
			Operation::ListIndexes,
		),
		Step::new(
			Additional,
			"Books with more than 300 pages",
			Operation::Count {
				filter: doc! { "pages": { "$gt": 300 } },
			},
		),
		Step::new(
			Additional,
			"Classic books (1800-1950)",
			Operation::Count {
				filter: doc! { "published_year": { "$gte": 1800, "$lte": 1950 } },
			},
		),
		Step::new(
			Additional,
			"Books with \"the\" in title",
			Operation::Count {
				filter: doc! {
					"title": Bson::RegularExpression(Regex {
						pattern: "the".to_string(),
						options: "i".to_string(),
					}),
				},
			},
		),
	]
}
