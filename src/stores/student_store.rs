use crate::core::error::StoreError;
use crate::models::student::{Cohort, NewStudent, Student};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::time::Duration;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    cohort INTEGER NOT NULL,
    mat TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_students_cohort_created
    ON students (cohort, created_at);
";

/// How long a connection waits on SQLite's write lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the single-file registrant database.
///
/// Holds only the path. Every operation opens its own connection and drops it
/// when done, so there is no shared connection state between requests.
#[derive(Clone, Debug)]
pub struct StudentStore {
    path: PathBuf,
}

impl StudentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a fresh connection
    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Create the table and index if they do not exist yet
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// All registrants ordered by cohort, then creation time
    pub fn list_all(&self) -> Result<Vec<Student>, StoreError> {
        let conn = self.connect()?;
        list_all(&conn)
    }

    /// Same rows and order as [`StudentStore::list_all`], for spreadsheet export
    pub fn export_all(&self) -> Result<Vec<Student>, StoreError> {
        self.list_all()
    }

    /// Remove a registrant. Returns whether a row was removed; callers that
    /// must not distinguish "not found" simply ignore it.
    pub fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        delete_by_id(&conn, id)
    }

    pub fn count_by_cohort(&self, cohort: Cohort) -> Result<u32, StoreError> {
        let conn = self.connect()?;
        count_by_cohort(&conn, cohort)
    }

    pub fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        exists_by_username(&conn, username)
    }

    /// Read the whole database file
    pub fn read_raw(&self) -> Result<Vec<u8>, StoreError> {
        Ok(std::fs::read(&self.path)?)
    }
}

// Connection-level operations. These take any `Connection` (a `Transaction`
// derefs to one) so the registration flow can run them inside one transaction.

pub fn count_by_cohort(conn: &Connection, cohort: Cohort) -> Result<u32, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE cohort = ?1",
        params![cohort.year()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u32)
}

pub fn exists_by_username(conn: &Connection, username: &str) -> Result<bool, StoreError> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM students WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id.is_some())
}

/// Insert a row and return its new id
pub fn insert(conn: &Connection, student: &NewStudent) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO students (username, password_hash, cohort, mat, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            student.username,
            student.password_hash,
            student.cohort.year(),
            student.mat,
            student.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_all(conn: &Connection) -> Result<Vec<Student>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, cohort, mat, created_at
         FROM students
         ORDER BY cohort, created_at, id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Student {
            id: row.get(0)?,
            username: row.get(1)?,
            cohort: row.get(2)?,
            mat: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;

    let mut students = Vec::new();
    for row in rows {
        students.push(row?);
    }
    Ok(students)
}

pub fn delete_by_id(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let affected = conn.execute("DELETE FROM students WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Password hash stored for a username
#[cfg(test)]
pub fn password_hash_for(conn: &Connection, username: &str) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT password_hash FROM students WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, StudentStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = StudentStore::new(temp_dir.path().join("test.db"));
        store.init_schema().unwrap();
        (temp_dir, store)
    }

    fn new_student(username: &str, cohort: Cohort, mat: &str, created_at: &str) -> NewStudent {
        NewStudent {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            cohort,
            mat: mat.to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let (_dir, store) = create_test_store();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_count() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "2026-01-01T00:00:00.000000Z")).unwrap();
        insert(&conn, &new_student("PLASU/2024/FNAS/0002", Cohort::Y2024, "0002", "2026-01-01T00:00:01.000000Z")).unwrap();
        insert(&conn, &new_student("PLASU/2025/FNAS/0003", Cohort::Y2025, "0003", "2026-01-01T00:00:02.000000Z")).unwrap();

        assert_eq!(store.count_by_cohort(Cohort::Y2024).unwrap(), 2);
        assert_eq!(store.count_by_cohort(Cohort::Y2025).unwrap(), 1);
    }

    #[test]
    fn test_ids_increase() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        let first = insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "t1")).unwrap();
        let second = insert(&conn, &new_student("PLASU/2024/FNAS/0002", Cohort::Y2024, "0002", "t2")).unwrap();
        assert!(second > first);

        // AUTOINCREMENT never hands out a deleted id again
        delete_by_id(&conn, second).unwrap();
        let third = insert(&conn, &new_student("PLASU/2024/FNAS/0003", Cohort::Y2024, "0003", "t3")).unwrap();
        assert!(third > second);
    }

    #[test]
    fn test_username_unique_constraint() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "t1")).unwrap();
        let result = insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "t2"));

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.count_by_cohort(Cohort::Y2024).unwrap(), 1);
    }

    #[test]
    fn test_exists_by_username() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        insert(&conn, &new_student("PLASU/2025/FNAS/4321", Cohort::Y2025, "4321", "t1")).unwrap();

        assert!(store.exists_by_username("PLASU/2025/FNAS/4321").unwrap());
        assert!(!store.exists_by_username("PLASU/2025/FNAS/1234").unwrap());
    }

    #[test]
    fn test_list_ordered_by_cohort_then_created_at() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        insert(&conn, &new_student("PLASU/2025/FNAS/0001", Cohort::Y2025, "0001", "2026-01-01T00:00:00.000000Z")).unwrap();
        insert(&conn, &new_student("PLASU/2024/FNAS/0002", Cohort::Y2024, "0002", "2026-01-01T00:00:05.000000Z")).unwrap();
        insert(&conn, &new_student("PLASU/2024/FNAS/0003", Cohort::Y2024, "0003", "2026-01-01T00:00:01.000000Z")).unwrap();
        insert(&conn, &new_student("PLASU/2025/FNAS/0004", Cohort::Y2025, "0004", "2025-12-31T23:59:59.000000Z")).unwrap();

        let usernames: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|s| s.username)
            .collect();

        assert_eq!(
            usernames,
            vec![
                "PLASU/2024/FNAS/0003",
                "PLASU/2024/FNAS/0002",
                "PLASU/2025/FNAS/0004",
                "PLASU/2025/FNAS/0001",
            ]
        );
        assert_eq!(store.export_all().unwrap().len(), 4);
    }

    #[test]
    fn test_delete_by_id() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        let id = insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "t1")).unwrap();

        assert!(store.delete_by_id(id).unwrap());
        assert!(!store.delete_by_id(id).unwrap());
        assert!(!store.delete_by_id(9999).unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_list_never_exposes_hash_but_store_keeps_it() {
        let (_dir, store) = create_test_store();
        let conn = store.connect().unwrap();

        insert(&conn, &new_student("PLASU/2024/FNAS/0001", Cohort::Y2024, "0001", "t1")).unwrap();

        let hash = password_hash_for(&conn, "PLASU/2024/FNAS/0001").unwrap();
        assert_eq!(hash.as_deref(), Some("$argon2id$placeholder"));
        assert_eq!(password_hash_for(&conn, "missing").unwrap(), None);
    }

    #[test]
    fn test_read_raw_returns_sqlite_file() {
        let (_dir, store) = create_test_store();
        let bytes = store.read_raw().unwrap();
        assert!(bytes.starts_with(b"SQLite format 3\0"));
    }
}
