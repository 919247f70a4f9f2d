use roster_core::db::migrations::latest_version;
use roster_core::db::{open_db, open_db_in_memory};
use roster_core::repo::user_session::normalize_users_limit;
use roster_core::{RepoError, SqliteUserSession, UserEntity, UserSession};
use rstest::rstest;
use rusqlite::Connection;

fn entity(pid: i64, first_name: &str, last_name: &str) -> UserEntity {
    UserEntity {
        pid,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

fn committed_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn insert_is_pending_until_commit() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
        session.insert(entity(123_456_789, "Kris", "Jordan")).unwrap();

        assert_eq!(session.pending_count(), 1);
        assert!(session.list_users(None, 0).unwrap().is_empty());
        assert_eq!(
            session.get_by_key(123_456_789).unwrap(),
            Some(entity(123_456_789, "Kris", "Jordan"))
        );

        session.commit().unwrap();
        assert_eq!(session.pending_count(), 0);
    }
    assert_eq!(committed_rows(&conn), 1);
}

#[test]
fn rollback_discards_pending_rows() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
        session.insert(entity(111_111_111, "A", "B")).unwrap();
        session.rollback();

        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.get_by_key(111_111_111).unwrap(), None);
        session.commit().unwrap();
    }
    assert_eq!(committed_rows(&conn), 0);
}

#[test]
fn dropping_session_discards_pending_rows() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
        session.insert(entity(222_222_222, "A", "B")).unwrap();
    }
    assert_eq!(committed_rows(&conn), 0);
}

#[test]
fn get_by_key_returns_none_for_unknown_pid() {
    let mut conn = open_db_in_memory().unwrap();
    let session = SqliteUserSession::try_new(&mut conn).unwrap();

    assert_eq!(session.get_by_key(999_999_999).unwrap(), None);
}

#[test]
fn insert_rejects_key_already_committed_or_pending() {
    let mut conn = open_db_in_memory().unwrap();
    let mut session = SqliteUserSession::try_new(&mut conn).unwrap();

    session.insert(entity(123_456_789, "Kris", "Jordan")).unwrap();
    let pending_dup = session
        .insert(entity(123_456_789, "Other", "Person"))
        .unwrap_err();
    assert!(matches!(pending_dup, RepoError::Conflict(123_456_789)));

    session.commit().unwrap();
    let committed_dup = session
        .insert(entity(123_456_789, "Other", "Person"))
        .unwrap_err();
    assert!(matches!(committed_dup, RepoError::Conflict(123_456_789)));
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn commit_surfaces_conflict_written_by_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let mut first_conn = open_db(&path).unwrap();
    let mut second_conn = open_db(&path).unwrap();

    let mut first = SqliteUserSession::try_new(&mut first_conn).unwrap();
    first.insert(entity(123_456_789, "Kris", "Jordan")).unwrap();
    first.insert(entity(234_567_891, "Ada", "Lovelace")).unwrap();

    {
        let mut second = SqliteUserSession::try_new(&mut second_conn).unwrap();
        second.insert(entity(234_567_891, "Grace", "Hopper")).unwrap();
        second.commit().unwrap();
    }

    let err = first.commit().unwrap_err();
    assert!(matches!(err, RepoError::Conflict(234_567_891)));
    assert_eq!(first.pending_count(), 2);
    first.rollback();
    drop(first);

    assert_eq!(committed_rows(&first_conn), 1);
    let loaded = SqliteUserSession::try_new(&mut first_conn)
        .unwrap()
        .get_by_key(234_567_891)
        .unwrap();
    assert_eq!(loaded, Some(entity(234_567_891, "Grace", "Hopper")));
}

#[test]
fn committed_rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    {
        let mut conn = open_db(&path).unwrap();
        let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
        session.insert(entity(123_456_789, "Kris", "Jordan")).unwrap();
        session.commit().unwrap();
    }

    let mut conn = open_db(&path).unwrap();
    let session = SqliteUserSession::try_new(&mut conn).unwrap();
    assert_eq!(
        session.get_by_key(123_456_789).unwrap(),
        Some(entity(123_456_789, "Kris", "Jordan"))
    );
}

#[test]
fn store_rejects_out_of_range_pid_on_commit() {
    let mut conn = open_db_in_memory().unwrap();
    let mut session = SqliteUserSession::try_new(&mut conn).unwrap();

    session.insert(entity(42, "bad", "row")).unwrap();
    let err = session.commit().unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn list_users_orders_by_pid_and_paginates() {
    let mut conn = open_db_in_memory().unwrap();
    let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
    for pid in [300_000_000, 100_000_000, 200_000_000] {
        session.insert(entity(pid, "first", "last")).unwrap();
    }
    session.commit().unwrap();

    let all: Vec<i64> = session
        .list_users(None, 0)
        .unwrap()
        .into_iter()
        .map(|row| row.pid)
        .collect();
    assert_eq!(all, vec![100_000_000, 200_000_000, 300_000_000]);

    let page: Vec<i64> = session
        .list_users(Some(1), 1)
        .unwrap()
        .into_iter()
        .map(|row| row.pid)
        .collect();
    assert_eq!(page, vec![200_000_000]);
}

#[rstest]
#[case::unset(None, 50)]
#[case::zero(Some(0), 50)]
#[case::one(Some(1), 1)]
#[case::at_max(Some(500), 500)]
#[case::above_max(Some(501), 500)]
#[case::u32_max(Some(u32::MAX), 500)]
fn users_limit_defaults_and_clamps(#[case] requested: Option<u32>, #[case] expected: u32) {
    assert_eq!(normalize_users_limit(requested), expected);
}

#[test]
fn list_users_applies_default_and_max_limits() {
    let mut conn = open_db_in_memory().unwrap();
    let mut session = SqliteUserSession::try_new(&mut conn).unwrap();
    for pid in 100_000_000..100_000_600 {
        session.insert(entity(pid, "first", "last")).unwrap();
    }
    session.commit().unwrap();

    assert_eq!(session.list_users(None, 0).unwrap().len(), 50);
    assert_eq!(session.list_users(Some(0), 0).unwrap().len(), 50);
    assert_eq!(session.list_users(Some(10_000), 0).unwrap().len(), 500);
    assert_eq!(session.list_users(Some(10_000), 590).unwrap().len(), 10);
}

#[test]
fn session_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SqliteUserSession::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    };
}

#[test]
fn session_rejects_connection_without_users_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteUserSession::try_new(&mut conn),
        Err(RepoError::MissingRequiredTable("users"))
    ));
}

#[test]
fn session_rejects_connection_missing_users_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            pid INTEGER PRIMARY KEY NOT NULL,
            first_name TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteUserSession::try_new(&mut conn),
        Err(RepoError::MissingRequiredColumn {
            table: "users",
            column: "last_name"
        })
    ));
}
