use review_core::db::open_db_in_memory;
use review_core::{
    RepoError, Review, ReviewRepository, ReviewValidationError, SqliteReviewRepository,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, job_title TEXT);
         INSERT INTO employees (id, name, job_title) VALUES (1, 'Lee', 'Manager');
         INSERT INTO employees (id, name, job_title) VALUES (2, 'Sasha', 'Engineer');
         INSERT INTO employees (id, name, job_title) VALUES (3, 'Kai', 'Analyst');",
    )
    .unwrap();
    conn
}

fn review_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM reviews;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_table_is_idempotent() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);

    repo.create_table().unwrap();
    repo.create_table().unwrap();

    let mut stmt = conn.prepare("PRAGMA table_info(reviews);").unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(1))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(columns, vec!["id", "year", "summary", "employee_id"]);
}

#[test]
fn drop_table_is_idempotent_and_later_queries_fail() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    repo.drop_table().unwrap();
    repo.drop_table().unwrap();

    assert!(matches!(repo.get_all().unwrap_err(), RepoError::Db(_)));
    assert!(matches!(repo.find_by_id(1).unwrap_err(), RepoError::Db(_)));
}

#[test]
fn create_then_find_by_id_roundtrip() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let created = repo.create(2023, "Great work", 2).unwrap();
    let id = created.id().unwrap();

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.year(), 2023);
    assert_eq!(loaded.summary(), "Great work");
    assert_eq!(loaded.employee_id(), 2);
}

#[test]
fn find_by_id_returns_none_for_missing_row() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    assert!(repo.find_by_id(42).unwrap().is_none());
}

#[test]
fn build_validates_every_field() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);

    let year_err = repo.build(1999, "fine", 1).unwrap_err();
    assert!(matches!(
        year_err,
        RepoError::Validation(ReviewValidationError::YearTooEarly { year: 1999 })
    ));

    let summary_err = repo.build(2020, "", 1).unwrap_err();
    assert!(matches!(
        summary_err,
        RepoError::Validation(ReviewValidationError::EmptySummary)
    ));

    let employee_err = repo.build(2020, "fine", 99).unwrap_err();
    assert!(matches!(
        employee_err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee { employee_id: 99 })
    ));
    assert!(employee_err.to_string().contains("employee_id"));

    let review = repo.build(2020, "fine", 3).unwrap();
    assert_eq!(review.id(), None);
}

#[test]
fn employee_check_hits_the_store_every_time() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);

    repo.build(2020, "before", 3).unwrap();
    conn.execute("DELETE FROM employees WHERE id = 3;", []).unwrap();

    let err = repo.build(2020, "after", 3).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee { employee_id: 3 })
    ));
}

#[test]
fn assign_employee_checks_existence_and_keeps_value_on_failure() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    let mut review = repo.build(2022, "moving teams", 1).unwrap();

    let err = repo.assign_employee(&mut review, 404).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(review.employee_id(), 1);

    repo.assign_employee(&mut review, 2).unwrap();
    assert_eq!(review.employee_id(), 2);
}

#[test]
fn save_assigns_sequential_ids_and_tracks_snapshot() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let first = repo.create(2021, "ok", 1).unwrap();
    let second = repo.create(2022, "ok2", 1).unwrap();

    assert_eq!(first.id(), Some(1));
    assert_eq!(second.id(), Some(2));
    assert_eq!(repo.tracked(1), Some(&first));
    assert_eq!(repo.tracked(2), Some(&second));
    assert_eq!(repo.tracked_ids(), vec![1, 2]);
}

#[test]
fn save_twice_is_rejected_without_duplicate_row() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut review = repo.build(2024, "once", 1).unwrap();
    let id = repo.save(&mut review).unwrap();

    let err = repo.save(&mut review).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted(existing) if existing == id));
    assert_eq!(review_count(&conn), 1);
}

#[test]
fn update_persists_mutated_fields() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut review = repo.create(2021, "draft", 1).unwrap();
    review.set_year(2022).unwrap();
    review.set_summary("final").unwrap();
    repo.assign_employee(&mut review, 3).unwrap();
    repo.update(&review).unwrap();

    let loaded = repo.find_by_id(review.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded.year(), 2022);
    assert_eq!(loaded.summary(), "final");
    assert_eq!(loaded.employee_id(), 3);
    assert_eq!(repo.tracked(review.id().unwrap()), Some(&review));
}

#[test]
fn update_requires_saved_row() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let unsaved = repo.build(2021, "never saved", 1).unwrap();
    assert!(matches!(
        repo.update(&unsaved).unwrap_err(),
        RepoError::NotPersisted
    ));

    let review = repo.create(2021, "saved", 1).unwrap();
    conn.execute("DELETE FROM reviews;", []).unwrap();
    let err = repo.update(&review).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if Some(id) == review.id()));
}

#[test]
fn delete_removes_row_untracks_and_detaches() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut review = repo.create(2023, "to be removed", 2).unwrap();
    let old_id = review.id().unwrap();

    repo.delete(&mut review).unwrap();

    assert_eq!(review.id(), None);
    assert!(!review.is_persisted());
    assert!(repo.tracked(old_id).is_none());
    assert!(repo.find_by_id(old_id).unwrap().is_none());
}

#[test]
fn delete_twice_fails() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut review = repo.create(2023, "once", 2).unwrap();
    let mut copy = review.clone();
    repo.delete(&mut review).unwrap();

    assert!(matches!(
        repo.delete(&mut review).unwrap_err(),
        RepoError::NotPersisted
    ));
    let err = repo.delete(&mut copy).unwrap_err();
    assert!(matches!(err, RepoError::NotTracked(id) if Some(id) == copy.id()));
}

#[test]
fn delete_of_untracked_review_leaves_row_in_place() {
    let conn = setup();
    let mut writer = SqliteReviewRepository::new(&conn);
    writer.create_table().unwrap();
    let saved = writer.create(2020, "owned by writer", 1).unwrap();

    let mut reader = SqliteReviewRepository::new(&conn);
    let mut fetched = reader.find_by_id(saved.id().unwrap()).unwrap().unwrap();

    let err = reader.delete(&mut fetched).unwrap_err();
    assert!(matches!(err, RepoError::NotTracked(_)));
    assert_eq!(fetched.id(), saved.id());
    assert_eq!(review_count(&conn), 1);
}

#[test]
fn reads_return_fresh_values_not_identity_map_entries() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2021, "stored", 1).unwrap();
    let id = review.id().unwrap();

    let mut fetched = repo.find_by_id(id).unwrap().unwrap();
    fetched.set_summary("edited locally").unwrap();

    assert_eq!(repo.tracked(id).unwrap().summary(), "stored");
    assert_eq!(repo.find_by_id(id).unwrap().unwrap().summary(), "stored");
}

#[test]
fn get_all_returns_every_row_in_id_order() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    assert!(repo.get_all().unwrap().is_empty());

    repo.create(2021, "a", 1).unwrap();
    repo.create(2022, "b", 2).unwrap();
    repo.create(2023, "c", 3).unwrap();

    let summaries: Vec<String> = repo
        .get_all()
        .unwrap()
        .iter()
        .map(|review| review.summary().to_string())
        .collect();
    assert_eq!(summaries, vec!["a", "b", "c"]);
}

#[test]
fn get_by_employee_id_filters_exactly() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut expected = HashSet::new();
    for (year, employee_id) in [(2020, 1), (2021, 2), (2022, 1), (2023, 3), (2024, 1)] {
        let review = repo.create(year, "entry", employee_id).unwrap();
        if employee_id == 1 {
            expected.insert(review.id().unwrap());
        }
    }

    let found = repo.get_by_employee_id(1).unwrap();
    assert!(found.iter().all(|review| review.employee_id() == 1));
    let ids: HashSet<_> = found.iter().filter_map(Review::id).collect();
    assert_eq!(ids, expected);

    assert!(repo.get_by_employee_id(404).unwrap().is_empty());
}

#[test]
fn rehydration_rejects_non_integer_year() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (7, 'two thousand', 'x', 1);",
        [],
    )
    .unwrap();

    let err = repo.find_by_id(7).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::NonIntegerYear)
    ));
    assert!(err.to_string().contains("year must be an integer"));
}

#[test]
fn rehydration_rejects_rows_breaking_invariants() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (year, summary, employee_id) VALUES (1995, 'old', 1);",
        [],
    )
    .unwrap();

    assert!(matches!(
        repo.get_all().unwrap_err(),
        RepoError::Validation(ReviewValidationError::YearTooEarly { year: 1995 })
    ));
}

#[test]
fn rehydration_rejects_null_summary() {
    let conn = setup();
    let repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();
    conn.execute(
        "INSERT INTO reviews (year, summary, employee_id) VALUES (2021, NULL, 1);",
        [],
    )
    .unwrap();

    assert!(matches!(
        repo.find_by_id(1).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn reads_fail_once_the_employee_is_gone() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let review = repo.create(2021, "ok", 1).unwrap();
    repo.create(2022, "unaffected", 2).unwrap();
    conn.execute("DELETE FROM employees WHERE id = 1;", []).unwrap();

    let unknown = |err: RepoError| {
        matches!(
            err,
            RepoError::Validation(ReviewValidationError::UnknownEmployee { employee_id: 1 })
        )
    };
    assert!(unknown(repo.find_by_id(review.id().unwrap()).unwrap_err()));
    assert!(unknown(repo.get_by_employee_id(1).unwrap_err()));
    assert!(unknown(repo.get_all().unwrap_err()));

    assert_eq!(repo.get_by_employee_id(2).unwrap().len(), 1);
}

#[test]
fn delete_reports_row_removed_outside_repository() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let mut review = repo.create(2023, "removed behind our back", 2).unwrap();
    let id = review.id().unwrap();
    conn.execute("DELETE FROM reviews WHERE id = ?1;", [id]).unwrap();

    let err = repo.delete(&mut review).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
    assert_eq!(review.id(), Some(id));
    assert!(repo.tracked(id).is_none());
}

#[test]
fn identity_map_is_scoped_to_repository_value() {
    let conn = setup();
    {
        let mut repo = SqliteReviewRepository::new(&conn);
        repo.create_table().unwrap();
        repo.create(2021, "first session", 1).unwrap();
        assert_eq!(repo.tracked_ids(), vec![1]);
    }

    let repo = SqliteReviewRepository::new(&conn);
    assert!(repo.tracked_ids().is_empty());
    assert_eq!(repo.get_all().unwrap().len(), 1);
}

#[test]
fn two_review_scenario() {
    let conn = setup();
    let mut repo = SqliteReviewRepository::new(&conn);
    repo.create_table().unwrap();

    let first = repo.create(2021, "ok", 1).unwrap();
    let second = repo.create(2022, "ok2", 1).unwrap();
    assert_eq!(first.id(), Some(1));
    assert_eq!(second.id(), Some(2));

    assert_eq!(repo.get_all().unwrap().len(), 2);
    assert_eq!(repo.get_by_employee_id(1).unwrap(), vec![first, second]);

    repo.drop_table().unwrap();
    assert!(repo.get_by_employee_id(1).is_err());
}
