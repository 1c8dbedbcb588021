mod helpers;

use client::{RefreshPhase, StatusCode};
use fake_backend::Collection;
use helpers::{
    CLASS_ID, MARKED, MEMBERS, OUTSIDER, TEMPLATES, TestData, result_of, rows_of, setup_test_data, stored_mark,
};
use roster::{MarkField, MarkKey, RosterError, RosterOptions, RosterWorkbench};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn open(data: &TestData) -> RosterWorkbench {
    RosterWorkbench::load(&data.client, CLASS_ID, RosterOptions::default(), CancellationToken::new())
        .await
        .expect("Failed to load roster")
}

fn class_members(data: &TestData) -> Vec<i64> {
    let class = data.backend.record(Collection::Classes, CLASS_ID).unwrap();
    class["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

/// Test Case: Add one student, remove another, enter one mark, save everything
#[tokio::test]
async fn test_roster_and_marks_end_to_end() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    assert_eq!(bench.add_students(&[OUTSIDER]), vec![OUTSIDER]);
    bench.remove_student(2).await.unwrap();
    bench.set_mark(OUTSIDER, 1, MarkField::Theory, "78").unwrap();

    bench.save_roster().await.unwrap();
    let members = class_members(&data);
    assert_eq!(members.len(), 12);
    assert!(members.contains(&OUTSIDER));
    assert!(!members.contains(&2));

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.results_created, 1);
    assert_eq!(report.patched, 1);
    assert!(report.unseeded.is_empty());

    assert_eq!(data.backend.results_created(), 1);
    assert_eq!(data.backend.patch_calls(), 1);
    assert_eq!(stored_mark(&data.backend, OUTSIDER, 1, "theory_marks"), Some(78.0));

    // The workbench shows what the backend now holds.
    assert_eq!(bench.edit_for(OUTSIDER, 1).theory, "78");
    assert_eq!(bench.edit_for(OUTSIDER, 1).practical, "");
    let result = bench.result_for(OUTSIDER).unwrap().id;
    let row = bench.subject_result(MarkKey::new(result, 1)).unwrap();
    assert_eq!(row.theory_marks, Some(78.0));
}

/// Test Case: Load assembles the class, its subjects and the marks grid
#[tokio::test]
async fn test_load_builds_grid() {
    let data = setup_test_data().await;
    let bench = open(&data).await;

    assert_eq!(bench.class().id, CLASS_ID);
    assert_eq!(bench.course().name, "Grade D");
    assert_eq!(bench.templates().iter().map(|t| t.id).collect::<Vec<_>>(), TEMPLATES);
    assert_eq!(bench.selection(), MEMBERS.collect::<Vec<_>>().as_slice());
    assert_eq!(bench.directory().len(), 13);
    assert_eq!(bench.selected_students().len(), 12);

    for student in MEMBERS {
        assert!(bench.result_for(student).is_some());
        let edit = bench.edit_for(student, 2);
        if MARKED.contains(&student) {
            assert_eq!((edit.theory.as_str(), edit.practical.as_str()), ("65", "70"));
        } else {
            assert_eq!((edit.theory.as_str(), edit.practical.as_str()), ("", ""));
        }
    }
    assert!(bench.result_for(OUTSIDER).is_none());
}

/// Test Case: A small directory page size still pulls every student
#[tokio::test]
async fn test_load_pages_through_directory() {
    let data = setup_test_data().await;
    let bench = RosterWorkbench::load(
        &data.client,
        CLASS_ID,
        RosterOptions { student_page_size: 4 },
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(bench.directory().len(), 13);
}

/// Test Case: Unknown class is reported as not found
#[tokio::test]
async fn test_load_missing_class() {
    let data = setup_test_data().await;
    let err = RosterWorkbench::load(&data.client, 99, RosterOptions::default(), CancellationToken::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RosterError::ClassNotFound(99)));
}

/// Test Case: Search only offers students not already on the roster
#[tokio::test]
async fn test_search_and_add() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    let found: Vec<i64> = bench.search_available("STUDENT1").iter().map(|s| s.id).collect();
    assert_eq!(found, vec![OUTSIDER]);
    assert!(bench.search_available("odd").iter().all(|s| s.id == OUTSIDER));
    assert!(bench.search_available("9001015000013").iter().any(|s| s.id == OUTSIDER));

    // Duplicates and ids outside the directory are ignored.
    assert_eq!(bench.add_students(&[1, 404, OUTSIDER, OUTSIDER]), vec![OUTSIDER]);
    assert_eq!(bench.selection().len(), 13);
    assert!(bench.search_available("").is_empty());
}

/// Test Case: Saving the roster replaces the membership with the selection
#[tokio::test]
async fn test_save_roster_is_full_replace() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    for id in 6..=12 {
        assert!(bench.deselect_student(id));
    }
    bench.add_students(&[OUTSIDER]);
    bench.save_roster().await.unwrap();

    assert_eq!(class_members(&data), vec![1, 2, 3, 4, 5, OUTSIDER]);
    assert_eq!(bench.class().students, vec![1, 2, 3, 4, 5, OUTSIDER]);
}

/// Test Case: Removing a student keeps their marks rows on the backend
#[tokio::test]
async fn test_remove_student_keeps_marks() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.remove_student(1).await.unwrap();
    assert!(!class_members(&data).contains(&1));
    assert!(!bench.selection().contains(&1));
    assert_eq!(stored_mark(&data.backend, 1, 1, "theory_marks"), Some(65.0));

    let err = bench.remove_student(404).await.unwrap_err();
    assert!(matches!(err, RosterError::UnknownStudent(404)));
}

/// Test Case: Blank and non-numeric input is never sent
#[tokio::test]
async fn test_non_numeric_marks_are_excluded() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(1, 1, MarkField::Theory, "").unwrap();
    bench.set_mark(1, 2, MarkField::Practical, "abc").unwrap();
    bench.set_mark(6, 3, MarkField::Theory, "  ").unwrap();

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.patched, 0);
    assert_eq!(data.backend.patch_calls(), 0);
    assert_eq!(stored_mark(&data.backend, 1, 1, "theory_marks"), Some(65.0));
    assert_eq!(bench.edit_for(1, 1).theory, "65");
}

/// Test Case: A patch carries only the field that changed
#[tokio::test]
async fn test_patch_is_partial() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(3, 2, MarkField::Practical, " 44.5 ").unwrap();
    bench.set_mark(7, 1, MarkField::Theory, "50").unwrap();

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.patched, 2);
    assert_eq!(report.results_created, 0);
    assert_eq!(stored_mark(&data.backend, 3, 2, "practical_marks"), Some(44.5));
    assert_eq!(stored_mark(&data.backend, 3, 2, "theory_marks"), Some(65.0));
    assert_eq!(stored_mark(&data.backend, 7, 1, "theory_marks"), Some(50.0));
    assert_eq!(stored_mark(&data.backend, 7, 1, "practical_marks"), None);
}

/// Test Case: Edits typed for a student who is deselected before saving are dropped
#[tokio::test]
async fn test_deselect_discards_pending_edits() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.add_students(&[OUTSIDER]);
    bench.set_mark(OUTSIDER, 1, MarkField::Theory, "90").unwrap();
    bench.deselect_student(OUTSIDER);
    bench.add_students(&[OUTSIDER]);
    assert_eq!(bench.edit_for(OUTSIDER, 1).theory, "");

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.results_created, 1);
    assert_eq!(report.patched, 0);
    assert_eq!(stored_mark(&data.backend, OUTSIDER, 1, "theory_marks"), None);
}

/// Test Case: Rejected patches are reported and the grid is re-read anyway
#[tokio::test]
async fn test_partial_save_still_refreshes() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(8, 1, MarkField::Theory, "150").unwrap();
    bench.set_mark(9, 1, MarkField::Theory, "88").unwrap();

    match bench.save_marks().await {
        Err(RosterError::PartialSave {
            failed,
            total,
            first_error,
        }) => {
            assert_eq!((failed, total), (1, 2));
            assert!(first_error.starts_with("theory_marks: "), "{first_error}");
        }
        other => panic!("expected PartialSave, got {other:?}"),
    }

    assert_eq!(stored_mark(&data.backend, 9, 1, "theory_marks"), Some(88.0));
    assert_eq!(bench.edit_for(9, 1).theory, "88");
    assert_eq!(bench.edit_for(8, 1).theory, "");
}

/// Test Case: Rejected patches are still reported when the re-read fails too
#[tokio::test]
async fn test_partial_save_wins_over_failed_reread() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(8, 1, MarkField::Theory, "150").unwrap();
    bench.set_mark(9, 1, MarkField::Theory, "88").unwrap();
    data.backend.break_subject_result_listing(true);

    match bench.save_marks().await {
        Err(RosterError::PartialSave { failed, total, .. }) => assert_eq!((failed, total), (1, 2)),
        other => panic!("expected PartialSave, got {other:?}"),
    }
    assert_eq!(stored_mark(&data.backend, 9, 1, "theory_marks"), Some(88.0));
}

/// Test Case: A failed re-read after a clean save is reported as such
#[tokio::test]
async fn test_failed_reread_after_clean_save() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(9, 1, MarkField::Theory, "88").unwrap();
    data.backend.break_subject_result_listing(true);

    let err = bench.save_marks().await.unwrap_err();
    match err {
        RosterError::Client(err) => assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR)),
        other => panic!("expected a backend error, got {other:?}"),
    }
    assert_eq!(stored_mark(&data.backend, 9, 1, "theory_marks"), Some(88.0));
}

/// Test Case: A typed mark with no backend row is skipped and reported
#[tokio::test]
async fn test_unseeded_cell_is_reported() {
    let data = setup_test_data().await;
    let result = result_of(&data.backend, 10).unwrap();
    let row = rows_of(&data.backend, result)
        .into_iter()
        .find(|r| r["template"].as_i64() == Some(3))
        .unwrap();
    assert!(data.backend.remove_record(Collection::SubjectResults, row["id"].as_i64().unwrap()));

    let mut bench = open(&data).await;
    bench.set_mark(10, 3, MarkField::Theory, "70").unwrap();
    bench.set_mark(10, 2, MarkField::Theory, "71").unwrap();

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.unseeded, vec![MarkKey::new(result, 3)]);
    assert_eq!(report.patched, 1);
    assert_eq!(rows_of(&data.backend, result).len(), 2);
}

/// Test Case: Marks for unknown students or subjects are refused
#[tokio::test]
async fn test_set_mark_validates_cell() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    assert!(matches!(
        bench.set_mark(OUTSIDER, 1, MarkField::Theory, "1"),
        Err(RosterError::UnknownStudent(OUTSIDER))
    ));
    assert!(matches!(
        bench.set_mark(1, 42, MarkField::Theory, "1"),
        Err(RosterError::UnknownTemplate(42))
    ));
}

/// Test Case: Cancelling the workbench token stops a save before anything is sent
#[tokio::test]
async fn test_cancelled_save_sends_nothing() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    bench.set_mark(4, 1, MarkField::Theory, "12").unwrap();
    bench.cancel_token().cancel();

    let err = bench.save_marks().await.unwrap_err();
    assert!(matches!(err, RosterError::Cancelled));
    assert_eq!(data.backend.patch_calls(), 0);
}

/// Test Case: A cancelled token aborts the load
#[tokio::test]
async fn test_cancelled_load() {
    let data = setup_test_data().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = RosterWorkbench::load(&data.client, CLASS_ID, RosterOptions::default(), cancel)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RosterError::Cancelled));
}

/// Test Case: Cancelling while a backend call is in flight aborts the load
/// and leaves the client usable
#[tokio::test]
async fn test_cancel_during_slow_load() {
    let data = setup_test_data().await;
    data.backend.set_refresh_delay(Duration::from_millis(400));
    data.backend.revoke_access_tokens();

    let cancel = CancellationToken::new();
    let load = RosterWorkbench::load(&data.client, CLASS_ID, RosterOptions::default(), cancel.clone());
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    let (outcome, ()) = tokio::join!(load, trigger);

    assert!(matches!(outcome.err(), Some(RosterError::Cancelled)));
    assert_eq!(data.client.refresh_phase(), RefreshPhase::Idle);
    assert!(data.client.is_authenticated());

    data.backend.set_refresh_delay(Duration::ZERO);
    let bench = open(&data).await;
    assert_eq!(bench.selection().len(), 12);
}

/// Test Case: Cancelling while marks patches are in flight stops the save
#[tokio::test]
async fn test_cancel_during_slow_save() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;
    bench.set_mark(4, 1, MarkField::Theory, "12").unwrap();

    data.backend.set_refresh_delay(Duration::from_millis(400));
    data.backend.revoke_access_tokens();

    let cancel = bench.cancel_token();
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    let (outcome, ()) = tokio::join!(bench.save_marks(), trigger);

    assert!(matches!(outcome, Err(RosterError::Cancelled)));
    assert_eq!(data.client.refresh_phase(), RefreshPhase::Idle);
    assert_eq!(stored_mark(&data.backend, 4, 1, "theory_marks"), Some(65.0));
}

/// Test Case: An access token that expires mid-session is refreshed transparently
#[tokio::test]
async fn test_save_survives_token_expiry() {
    let data = setup_test_data().await;
    let mut bench = open(&data).await;

    data.backend.revoke_access_tokens();
    bench.set_mark(5, 3, MarkField::Practical, "99").unwrap();
    bench.set_mark(6, 3, MarkField::Practical, "98").unwrap();

    let report = bench.save_marks().await.unwrap();
    assert_eq!(report.patched, 2);
    assert_eq!(data.backend.refresh_calls(), 1);
    assert_eq!(stored_mark(&data.backend, 6, 3, "practical_marks"), Some(98.0));
}
