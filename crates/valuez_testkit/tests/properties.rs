//! End-to-end checks of the collection guarantees.

use proptest::prelude::*;
use valuez_core::{CallbackResult, CoreError, ItemId, Value};
use valuez_testkit::prelude::*;

fn is_text(text: &'static str) -> impl Fn(&Value) -> CallbackResult<bool> + Send + 'static {
    move |v: &Value| -> CallbackResult<bool> { Ok(v.as_text() == Some(text)) }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn put_ids_strictly_increase(payloads in payloads_strategy(24)) {
        let test_db = TestDatabase::memory();
        let items = test_db.new_collection("items").unwrap();

        let mut last: Option<ItemId> = None;
        for payload in &payloads {
            let id = items.put(payload.clone()).unwrap();
            if let Some(prev) = last {
                prop_assert!(id > prev);
            }
            last = Some(id);
        }
    }

    #[test]
    fn as_list_returns_every_put(payloads in payloads_strategy(24)) {
        let test_db = TestDatabase::memory();
        let items = test_db.new_collection("items").unwrap();
        for payload in &payloads {
            items.put(payload.clone()).unwrap();
        }

        let list = items.as_list().unwrap();
        prop_assert_eq!(list.len(), payloads.len());
        // identifiers are handed out in put order, so the list follows it
        prop_assert_eq!(&*list, &payloads);
    }

    #[test]
    fn collection_names_roundtrip_through_disk(name in collection_name_strategy()) {
        let test_db = TestDatabase::file();
        test_db.new_collection(&name).unwrap();

        let test_db = test_db.reopen();
        prop_assert_eq!(test_db.collection_names(), vec![name]);
    }
}

#[test]
fn take_removes_exactly_the_matches() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();
    for v in ["a", "b", "a", "c"] {
        items.put(v).unwrap();
    }

    let taken = items.take(is_text("a")).unwrap();
    assert_eq!(taken, vec![Value::from("a"), Value::from("a")]);
    assert_eq!(
        *items.as_list().unwrap(),
        vec![Value::from("b"), Value::from("c")]
    );

    assert!(items.take(is_text("a")).unwrap().is_empty());
}

#[test]
fn failed_put_changes_nothing() {
    let test_db = TestDatabase::flaky();
    let items = test_db.new_collection("items").unwrap();
    items.put("kept").unwrap();
    let before = items.as_list().unwrap();

    test_db.faults().fail_next(1);
    assert!(matches!(
        items.put("lost"),
        Err(CoreError::CommitFailed { .. })
    ));

    assert_eq!(items.as_list().unwrap(), before);
    assert_eq!(test_db.faults().injected(), 1);
}

#[test]
fn failed_update_changes_nothing() {
    let test_db = TestDatabase::flaky();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();
    items.put("b").unwrap();
    let before = items.as_list().unwrap();

    test_db.faults().fail_next(1);
    let changed = items.update(|_| Ok(Some(Value::from("rewritten")))).unwrap();

    assert!(!changed);
    assert_eq!(items.as_list().unwrap(), before);
    assert_eq!(test_db.faults().injected(), 1);

    // the next attempt goes through
    assert!(items.update(|_| Ok(Some(Value::from("rewritten")))).unwrap());
    assert_eq!(items.get(is_text("rewritten")).unwrap().len(), 2);
}

#[test]
fn failed_delete_still_closes_collection() {
    let test_db = TestDatabase::flaky();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();

    test_db.faults().fail_next(1);
    assert!(items.delete().is_err());

    assert!(items.is_closed());
    assert!(test_db.collection_names().is_empty());
    assert!(matches!(
        items.put("b"),
        Err(CoreError::CollectionClosed { .. })
    ));
    assert!(matches!(
        items.take(is_text("a")),
        Err(CoreError::CollectionClosed { .. })
    ));
    assert!(matches!(
        test_db.collection("items"),
        Err(CoreError::CollectionNotFound { .. })
    ));
}

#[test]
fn view_does_not_see_later_puts() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();

    let before = items.view().unwrap();
    items.put("b").unwrap();

    assert_eq!(before.len(), 1);
    assert_eq!(*before.as_list(), vec![Value::from("a")]);

    let after = items.view().unwrap();
    assert_eq!(*after.as_list(), vec![Value::from("a"), Value::from("b")]);
}

#[test]
fn view_rejects_mutation() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();

    let result = items.open_view(|view| {
        assert!(view.is_read_only());
        Ok(view.get(|_| Ok(true))?.len())
    });
    assert_eq!(result.unwrap(), 0);

    let mut view = items.view().unwrap();
    assert!(matches!(
        view.put("x"),
        Err(CoreError::ReadOnlyView { operation: "put" })
    ));
    assert!(matches!(
        view.delete_collection(),
        Err(CoreError::NotAllowedInTransaction { .. })
    ));
}

#[test]
fn declined_transaction_leaves_no_trace() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();
    items.put("b").unwrap();
    let before = items.as_list().unwrap();

    let committed = items
        .run_transaction(|txn| {
            txn.put("c")?;
            txn.take(|v| Ok(v.as_text() == Some("a")))?;
            assert_eq!(txn.len(), 2);
            Ok(false)
        })
        .unwrap();

    assert!(!committed);
    assert_eq!(items.as_list().unwrap(), before);
    assert_eq!(test_db.stats().transactions_aborted, 1);
}

#[test]
fn transaction_commits_as_one_batch() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();
    let batches = test_db.stats().batches_applied;

    let committed = items
        .run_transaction(|txn| {
            txn.put("b")?;
            txn.put("c")?;
            txn.take(|v| Ok(v.as_text() == Some("a")))?;
            Ok(true)
        })
        .unwrap();

    assert!(committed);
    assert_eq!(
        *items.as_list().unwrap(),
        vec![Value::from("b"), Value::from("c")]
    );
    assert_eq!(test_db.stats().batches_applied, batches + 1);
}

#[test]
fn failed_transaction_commit_changes_nothing() {
    let test_db = TestDatabase::flaky();
    let items = test_db.new_collection("items").unwrap();
    items.put("a").unwrap();
    let before = items.as_list().unwrap();

    test_db.faults().fail_all();
    let committed = items
        .run_transaction(|txn| {
            txn.put("b")?;
            txn.update(|_| Ok(Some(Value::from("z"))))?;
            Ok(true)
        })
        .unwrap();

    assert!(!committed);
    assert_eq!(items.as_list().unwrap(), before);
}

#[test]
fn transaction_body_error_is_reported() {
    let test_db = TestDatabase::memory();
    let items = test_db.new_collection("items").unwrap();

    let result = items.run_transaction(|txn| {
        txn.put("never")?;
        Err("gave up".into())
    });

    match result {
        Err(CoreError::Callback { message, .. }) => assert_eq!(message, "gave up"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(items.is_empty());
}

#[test]
fn warm_start_round_trip() {
    let test_db = TestDatabase::file();
    let items = test_db.new_collection("items").unwrap();
    let ids: Vec<ItemId> = ["x", "y", "z"]
        .into_iter()
        .map(|v| items.put(v).unwrap())
        .collect();
    drop(items);

    let test_db = test_db.reopen();
    let items = test_db.collection("items").unwrap();
    assert_eq!(
        *items.as_list().unwrap(),
        vec![Value::from("x"), Value::from("y"), Value::from("z")]
    );

    let next = items.put("w").unwrap();
    assert!(ids.iter().all(|id| next > *id));
}

#[test]
fn update_survives_reopen() {
    let test_db = TestDatabase::file();
    let items = test_db.new_collection("items").unwrap();
    items.put(Value::record([("n", Value::from(1))])).unwrap();
    items.put(Value::record([("n", Value::from(2))])).unwrap();

    let changed = items
        .update(|v| {
            Ok(match v.get("n").and_then(Value::as_integer) {
                Some(2) => Some(v.with("n", Value::from(20))),
                _ => None,
            })
        })
        .unwrap();
    assert!(changed);
    drop(items);

    let test_db = test_db.reopen();
    let list = test_db.collection("items").unwrap().as_list().unwrap();
    assert_eq!(list[0].get("n"), Some(&Value::Integer(1)));
    assert_eq!(list[1].get("n"), Some(&Value::Integer(20)));
}
