use taskbot_core::db::open_db_in_memory;
use taskbot_core::{
    NewTask, RepoError, SqliteTaskRepository, TaskRepository, UnavailableTaskRepository,
};
use uuid::Uuid;

fn repo() -> SqliteTaskRepository {
    SqliteTaskRepository::new(open_db_in_memory().expect("open in-memory db"))
}

fn descriptions(repo: &SqliteTaskRepository) -> Vec<String> {
    repo.list_tasks()
        .expect("list tasks")
        .into_iter()
        .map(|task| task.description)
        .collect()
}

#[test]
fn create_assigns_increasing_seq_and_keeps_draft_fields() {
    let repo = repo();

    let draft = NewTask::new("first");
    let first = repo.create_task(draft.clone()).expect("create task");
    let second = repo.create_task(NewTask::new("second")).expect("create task");

    assert_eq!(first.id, draft.id);
    assert_eq!(first.description, "first");
    assert_eq!(first.date_added, draft.date_added);
    assert!(second.seq > first.seq);
}

#[test]
fn list_returns_creation_order() {
    let repo = repo();
    for description in ["c", "a", "b"] {
        repo.create_task(NewTask::new(description)).expect("create task");
    }

    assert_eq!(descriptions(&repo), vec!["c", "a", "b"]);
}

#[test]
fn duplicates_are_allowed() {
    let repo = repo();
    repo.create_task(NewTask::new("same")).expect("create task");
    repo.create_task(NewTask::new("same")).expect("create task");

    assert_eq!(descriptions(&repo), vec!["same", "same"]);
}

#[test]
fn delete_removes_by_identity_and_reports_missing() {
    let repo = repo();
    let keep = repo.create_task(NewTask::new("keep")).expect("create task");
    let removed = repo.create_task(NewTask::new("drop")).expect("create task");

    repo.delete_task(removed.id).expect("delete task");
    let remaining = repo.list_tasks().expect("list tasks");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);

    let missing = Uuid::new_v4();
    let err = repo.delete_task(missing).expect_err("missing task");
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn take_task_at_removes_the_positioned_task() {
    let repo = repo();
    for description in ["a", "b", "c"] {
        repo.create_task(NewTask::new(description)).expect("create task");
    }

    let taken = repo.take_task_at(1).expect("take task").expect("task at position");
    assert_eq!(taken.description, "b");
    assert_eq!(descriptions(&repo), vec!["a", "c"]);
}

#[test]
fn take_task_at_out_of_range_leaves_store_untouched() {
    let repo = repo();
    repo.create_task(NewTask::new("only")).expect("create task");

    assert!(repo.take_task_at(1).expect("take task").is_none());
    assert!(repo.take_task_at(usize::MAX).expect("take task").is_none());
    assert_eq!(descriptions(&repo), vec!["only"]);
}

#[test]
fn seq_is_not_reused_after_delete() {
    let repo = repo();
    repo.create_task(NewTask::new("a")).expect("create task");
    let last = repo.create_task(NewTask::new("b")).expect("create task");
    repo.delete_task(last.id).expect("delete task");

    let next = repo.create_task(NewTask::new("c")).expect("create task");
    assert!(next.seq > last.seq);
}

#[test]
fn list_rejects_rows_with_invalid_ids() {
    let conn = open_db_in_memory().expect("open in-memory db");
    conn.execute(
        "INSERT INTO tasks (id, description, date_added) VALUES ('not-a-uuid', 'x', 0);",
        [],
    )
    .expect("insert raw row");
    let repo = SqliteTaskRepository::new(conn);

    let err = repo.list_tasks().expect_err("store failure");
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn unavailable_repository_fails_every_call() {
    let repo = UnavailableTaskRepository::new("disk missing");

    let err = repo.create_task(NewTask::new("x")).expect_err("store failure");
    assert!(err.to_string().contains("disk missing"));
    assert!(matches!(
        repo.list_tasks().expect_err("store failure"),
        RepoError::Unavailable(_)
    ));
    assert!(matches!(
        repo.take_task_at(0).expect_err("store failure"),
        RepoError::Unavailable(_)
    ));
}
