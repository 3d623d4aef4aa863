use crate::core::error::{RegistrationError, StoreError};
use crate::models::student::{Cohort, NewStudent, Student};
use crate::stores::student_store::{self, StudentStore};
use crate::utils::time::{format_created_at, now_utc};
use crate::validation::registration::ValidRegistration;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

/// Admits validated students into their cohort.
///
/// Capacity and uniqueness are checked twice: once on a plain connection so
/// that hopeless submissions never pay for hashing, and again inside an
/// immediate (write-locked) transaction right before the insert. The second
/// check is the one that holds, so concurrent submissions cannot push a
/// cohort past `max_per_cohort`.
#[derive(Clone)]
pub struct RegistrationService {
    store: StudentStore,
    max_per_cohort: u32,
    hash_params: Params,
}

impl RegistrationService {
    pub fn new(store: StudentStore, max_per_cohort: u32) -> Self {
        Self {
            store,
            max_per_cohort,
            hash_params: Params::default(),
        }
    }

    /// Override the Argon2 cost parameters
    pub fn with_hash_params(mut self, params: Params) -> Self {
        self.hash_params = params;
        self
    }

    /// Blocking registration. Run it off the async executor.
    pub fn register(&self, registration: &ValidRegistration) -> Result<Student, RegistrationError> {
        let mut conn = self.store.connect()?;

        self.check_admission(&conn, registration)?;

        let password_hash = self.hash_password(&registration.password)?;
        let created_at = format_created_at(now_utc());

        let new_student = NewStudent {
            username: registration.username.clone(),
            password_hash,
            cohort: registration.cohort,
            mat: registration.mat.clone(),
            created_at,
        };

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        // Re-check under the write lock; an early return rolls back on drop
        self.check_admission(&tx, registration)?;

        let id = match student_store::insert(&tx, &new_student) {
            Ok(id) => id,
            Err(StoreError::Database(e)) if is_unique_violation(&e) => {
                return Err(RegistrationError::DuplicateUsername);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().map_err(StoreError::from)?;

        info!(
            student_id = id,
            cohort = registration.cohort.year(),
            mat = %registration.mat,
            "Student registered"
        );

        Ok(Student {
            id,
            username: new_student.username,
            cohort: new_student.cohort.year(),
            mat: new_student.mat,
            created_at: new_student.created_at,
        })
    }

    /// Run [`RegistrationService::register`] on the blocking pool
    pub async fn register_async(
        &self,
        registration: ValidRegistration,
    ) -> Result<Student, RegistrationError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.register(&registration))
            .await
            .map_err(StoreError::from)?
    }

    /// Capacity first, then uniqueness
    fn check_admission(
        &self,
        conn: &Connection,
        registration: &ValidRegistration,
    ) -> Result<(), RegistrationError> {
        let count = student_store::count_by_cohort(conn, registration.cohort)?;
        if count >= self.max_per_cohort {
            return Err(cohort_full(registration.cohort, self.max_per_cohort));
        }

        if student_store::exists_by_username(conn, &registration.username)? {
            return Err(RegistrationError::DuplicateUsername);
        }

        debug!(cohort = registration.cohort.year(), count, "Admission check passed");
        Ok(())
    }

    /// Salted Argon2id hash in PHC string form
    pub fn hash_password(&self, password: &str) -> Result<String, RegistrationError> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill(&mut salt_bytes);

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| RegistrationError::Hashing(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.hash_params.clone());

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| RegistrationError::Hashing(e.to_string()))
    }
}

fn cohort_full(cohort: Cohort, max: u32) -> RegistrationError {
    RegistrationError::CohortFull {
        cohort: cohort.to_string(),
        max,
    }
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
pub(crate) fn fast_hash_params() -> Params {
    Params::new(Params::MIN_M_COST, 1, 1, None).expect("minimum argon2 params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::registration::validate_registration;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_service(max_per_cohort: u32) -> (TempDir, StudentStore, RegistrationService) {
        let temp_dir = TempDir::new().unwrap();
        let store = StudentStore::new(temp_dir.path().join("test.db"));
        store.init_schema().unwrap();
        let service = RegistrationService::new(store.clone(), max_per_cohort)
            .with_hash_params(fast_hash_params());
        (temp_dir, store, service)
    }

    fn valid(cohort: Cohort, mat: &str) -> ValidRegistration {
        validate_registration(
            &format!("PLASU/{}/FNAS/{}", cohort, mat),
            &format!("AKTH/{}/CCC/{}", cohort, mat),
            cohort.as_str(),
        )
        .unwrap()
    }

    fn fill_cohort(store: &StudentStore, cohort: Cohort, count: u32) {
        let conn = store.connect().unwrap();
        for i in 0..count {
            student_store::insert(
                &conn,
                &NewStudent {
                    username: format!("PLASU/{}/FNAS/{:04}", cohort, 5000 + i),
                    password_hash: "$argon2id$placeholder".to_string(),
                    cohort,
                    mat: format!("{:04}", 5000 + i),
                    created_at: format_created_at(now_utc()),
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn test_register_example_student() {
        let (_dir, store, service) = create_test_service(30);

        let student = service.register(&valid(Cohort::Y2024, "0007")).unwrap();

        assert_eq!(student.cohort, 2024);
        assert_eq!(student.mat, "0007");
        assert_eq!(student.username, "PLASU/2024/FNAS/0007");
        assert!(student.created_at.ends_with('Z'));

        let listed = store.list_all().unwrap();
        assert_eq!(listed, vec![student]);
    }

    #[test]
    fn test_password_is_hashed_and_salted() {
        let (_dir, store, service) = create_test_service(30);

        service.register(&valid(Cohort::Y2024, "0001")).unwrap();
        service.register(&valid(Cohort::Y2025, "0001")).unwrap();

        let conn = store.connect().unwrap();
        let first = student_store::password_hash_for(&conn, "PLASU/2024/FNAS/0001")
            .unwrap()
            .unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("AKTH/2024/CCC/0001"));

        let parsed = PasswordHash::new(&first).unwrap();
        assert!(Argon2::default()
            .verify_password(b"AKTH/2024/CCC/0001", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"AKTH/2024/CCC/0002", &parsed)
            .is_err());

        // Same password twice yields different hashes
        let again = service.hash_password("AKTH/2024/CCC/0001").unwrap();
        assert_ne!(first, again);
    }

    #[test]
    fn test_cohort_full_rejects_without_insert() {
        let (_dir, store, service) = create_test_service(30);
        fill_cohort(&store, Cohort::Y2024, 30);

        let result = service.register(&valid(Cohort::Y2024, "0007"));

        match result {
            Err(RegistrationError::CohortFull { cohort, max }) => {
                assert_eq!(cohort, "2024");
                assert_eq!(max, 30);
            }
            other => panic!("expected CohortFull, got {:?}", other),
        }
        assert_eq!(store.count_by_cohort(Cohort::Y2024).unwrap(), 30);
        assert!(!store.exists_by_username("PLASU/2024/FNAS/0007").unwrap());
    }

    #[test]
    fn test_full_cohort_does_not_block_other_cohort() {
        let (_dir, store, service) = create_test_service(30);
        fill_cohort(&store, Cohort::Y2024, 30);

        assert!(service.register(&valid(Cohort::Y2025, "0007")).is_ok());
        assert_eq!(store.count_by_cohort(Cohort::Y2025).unwrap(), 1);
    }

    #[test]
    fn test_capacity_checked_before_duplicate() {
        let (_dir, store, service) = create_test_service(1);
        service.register(&valid(Cohort::Y2024, "0007")).unwrap();

        let result = service.register(&valid(Cohort::Y2024, "0007"));
        assert!(matches!(result, Err(RegistrationError::CohortFull { .. })));
        assert_eq!(store.count_by_cohort(Cohort::Y2024).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_username_keeps_original() {
        let (_dir, store, service) = create_test_service(30);

        let original = service.register(&valid(Cohort::Y2024, "0007")).unwrap();
        let result = service.register(&valid(Cohort::Y2024, "0007"));

        assert!(matches!(result, Err(RegistrationError::DuplicateUsername)));
        assert_eq!(store.list_all().unwrap(), vec![original]);
    }

    #[test]
    fn test_concurrent_registrations_never_exceed_capacity() {
        let (_dir, store, service) = create_test_service(5);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    service.register(&valid(Cohort::Y2025, &format!("{:04}", i)))
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => admitted += 1,
                Err(RegistrationError::CohortFull { .. }) => {}
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(store.count_by_cohort(Cohort::Y2025).unwrap(), 5);
    }

    #[tokio::test]
    async fn test_register_async() {
        let (_dir, store, service) = create_test_service(30);

        let student = service.register_async(valid(Cohort::Y2025, "1234")).await.unwrap();

        assert_eq!(student.cohort, 2025);
        assert!(store.exists_by_username("PLASU/2025/FNAS/1234").unwrap());
    }
}
