//! Document repository: the `documents` and `document_text` tables.
//!
//! `insert_document` and `insert_transcript` take a [`Transaction`] so both
//! rows are always written under one caller-managed commit.

use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Serialize;

use super::{Database, DatabaseError};

/// A row of the `documents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub name: String,
    #[serde(rename = "url")]
    pub document_url: String,
    pub created_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            document_url: row.get("document_url")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A document together with its transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub document: DocumentRow,
    pub extracted_text: String,
}

/// Inserts a document row and returns its id.
pub fn insert_document(
    tx: &Transaction<'_>,
    name: &str,
    document_url: &str,
) -> Result<i64, DatabaseError> {
    let created_at = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO documents (name, document_url, created_at) VALUES (?1, ?2, ?3)",
        params![name, document_url, created_at],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Inserts the transcript of `document_id` and returns its id.
pub fn insert_transcript(
    tx: &Transaction<'_>,
    document_id: i64,
    extracted_text: &str,
) -> Result<i64, DatabaseError> {
    tx.execute(
        "INSERT INTO document_text (document_id, extracted_text) VALUES (?1, ?2)",
        params![document_id, extracted_text],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Writes a document and its transcript atomically. Returns the document id.
pub fn save_document(
    db: &Database,
    name: &str,
    document_url: &str,
    extracted_text: &str,
) -> Result<i64, DatabaseError> {
    db.with_transaction(|tx| {
        let document_id = insert_document(tx, name, document_url)?;
        insert_transcript(tx, document_id, extracted_text)?;
        Ok(document_id)
    })
}

/// Newest first by rowid, so the primary key serves the ordering.
const LIST_DOCUMENTS_SQL: &str =
    "SELECT id, name, document_url, created_at FROM documents ORDER BY id DESC";

/// Lists all documents, newest first.
pub fn list_documents(db: &Database) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(LIST_DOCUMENTS_SQL)?;
        let rows = stmt
            .query_map([], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds a document and its transcript by document id.
pub fn find_document(db: &Database, id: i64) -> Result<Option<StoredDocument>, DatabaseError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT d.id, d.name, d.document_url, d.created_at, t.extracted_text
                 FROM documents d
                 JOIN document_text t ON t.document_id = d.id
                 WHERE d.id = ?1",
                params![id],
                |row| {
                    Ok(StoredDocument {
                        document: DocumentRow::from_row(row)?,
                        extracted_text: row.get("extracted_text")?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn reject_transcripts(db: &Database) {
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_transcripts BEFORE INSERT ON document_text
                 BEGIN SELECT RAISE(ABORT, 'transcript rejected'); END;",
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_save_and_find() {
        let db = test_db();
        let id = save_document(
            &db,
            "invoice.pdf",
            "https://cdn.example.com/invoice.pdf",
            "Total: 42",
        )
        .unwrap();

        let found = find_document(&db, id).unwrap().unwrap();
        assert_eq!(found.document.id, id);
        assert_eq!(found.document.name, "invoice.pdf");
        assert_eq!(
            found.document.document_url,
            "https://cdn.example.com/invoice.pdf"
        );
        assert_eq!(found.extracted_text, "Total: 42");
        assert!(!found.document.created_at.is_empty());
    }

    #[test]
    fn test_empty_transcript_is_stored() {
        let db = test_db();
        let id = save_document(&db, "blank.pdf", "file:///blank.pdf", "").unwrap();

        let found = find_document(&db, id).unwrap().unwrap();
        assert_eq!(found.extracted_text, "");
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_document(&db, 999).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = test_db();
        let first = save_document(&db, "a.pdf", "u/a.pdf", "a").unwrap();
        let second = save_document(&db, "b.pdf", "u/b.pdf", "b").unwrap();
        let third = save_document(&db, "a.pdf", "u/a2.pdf", "c").unwrap();

        let rows = list_documents(&db).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third, second, first]);
        // Names are not unique.
        assert_eq!(rows[0].name, "a.pdf");
        assert_eq!(rows[2].name, "a.pdf");
    }

    #[test]
    fn test_listing_needs_no_extra_index() {
        let db = test_db();
        let (plan, indexes) = db
            .with_conn(|conn| {
                let explain = format!("EXPLAIN QUERY PLAN {}", LIST_DOCUMENTS_SQL);
                let mut stmt = conn.prepare(&explain)?;
                let plan = stmt
                    .query_map([], |row| row.get::<_, String>("detail"))?
                    .collect::<Result<Vec<_>, _>>()?;
                let indexes: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'index' AND tbl_name = 'documents' AND sql IS NOT NULL",
                    [],
                    |row| row.get(0),
                )?;
                Ok((plan, indexes))
            })
            .unwrap();

        assert!(plan.iter().all(|step| !step.contains("TEMP B-TREE")), "{:?}", plan);
        assert_eq!(indexes, 0);
    }

    #[test]
    fn test_list_empty() {
        let db = test_db();
        assert!(list_documents(&db).unwrap().is_empty());
    }

    #[test]
    fn test_transcript_failure_rolls_back_document() {
        let db = test_db();
        reject_transcripts(&db);

        let result = save_document(&db, "invoice.pdf", "u/invoice.pdf", "Total: 42");
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));

        assert!(list_documents(&db).unwrap().is_empty());
    }

    #[test]
    fn test_inserts_share_the_callers_transaction() {
        let db = test_db();
        let result: Result<(), DatabaseError> = db.with_transaction(|tx| {
            let id = insert_document(tx, "x.pdf", "u/x.pdf")?;
            insert_transcript(tx, id, "text")?;
            Err(DatabaseError::LockPoisoned)
        });
        assert!(result.is_err());

        let counts: (u32, u32) = db
            .with_conn(|conn| {
                let docs = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
                let texts =
                    conn.query_row("SELECT COUNT(*) FROM document_text", [], |r| r.get(0))?;
                Ok((docs, texts))
            })
            .unwrap();
        assert_eq!(counts, (0, 0));
    }

    #[test]
    fn test_document_row_serializes_url_key() {
        let row = DocumentRow {
            id: 7,
            name: "invoice.pdf".to_string(),
            document_url: "https://cdn.example.com/invoice.pdf".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["url"], "https://cdn.example.com/invoice.pdf");
    }
}
