//! Sample data for seeding a fresh collection

use bookstore_nosql::{Document, NoSQLError};

use crate::book::Book;

/// The ten books the standard plan is written against
///
/// Contains `1984` priced at 10.00 and no `Test Book`.
pub fn sample_books() -> Vec<Book> {
	vec![
		Book::new("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 12.99, 336, true),
		Book::new("1984", "George Orwell", "Dystopian", 1949, 10.00, 328, true),
		Book::new("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 9.99, 180, true),
		Book::new("Brave New World", "Aldous Huxley", "Dystopian", 1932, 11.50, 311, false),
		Book::new("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 14.99, 310, true),
		Book::new("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 8.99, 224, true),
		Book::new("Pride and Prejudice", "Jane Austen", "Romance", 1813, 7.99, 432, true),
		Book::new("Animal Farm", "George Orwell", "Political Satire", 1945, 8.50, 112, false),
		Book::new("The Road", "Cormac McCarthy", "Post-apocalyptic", 2006, 13.49, 287, true),
		Book::new("The Midnight Library", "Matt Haig", "Fiction", 2020, 15.99, 304, true),
	]
}

pub fn sample_documents() -> Result<Vec<Document>, NoSQLError> {
	sample_books().iter().map(Book::to_document).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_sample_books_shape() {
		let books = sample_books();
		assert_eq!(books.len(), 10);

		let titles: HashSet<_> = books.iter().map(|b| b.title.as_str()).collect();
		assert_eq!(titles.len(), 10);
		assert!(titles.contains("1984"));
		assert!(!titles.contains("Test Book"));

		let prices: HashSet<u64> = books.iter().map(|b| b.price.to_bits()).collect();
		assert_eq!(prices.len(), 10, "prices are unique");
	}

	#[test]
	fn test_sample_documents() {
		let docs = sample_documents().unwrap();
		assert_eq!(docs.len(), 10);
		assert!(docs.iter().all(|d| !d.contains_key("_id")));
	}
}
