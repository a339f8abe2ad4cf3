use std::sync::Arc;

use serde_json::json;
use sheetstore::memory::WriteLog;
use sheetstore::record::records_from_json;
use sheetstore::{
    Filter,
    InputOption,
    MemoryTransport,
    Record,
    RenderMode,
    SheetRange,
    SheetStore,
    SheetStoreError,
};

const SHEET: &str = "spreadsheet-1";
const RANGE: &str = "Tasks!A1:C";

fn target() -> SheetRange {
    SheetRange::new(SHEET, RANGE)
}

fn setup(values: Vec<Vec<&str>>) -> (Arc<MemoryTransport>, SheetStore) {
    logutil::init_test();
    let transport = Arc::new(MemoryTransport::new());
    transport.set_values(&target(), values);
    let store = SheetStore::new(transport.clone());
    (transport, store)
}

fn tasks() -> Vec<Vec<&'static str>> {
    vec![
        vec!["id", "name", "status"],
        vec!["1", "a", ""],
        vec!["2", "b", "x"],
    ]
}

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn select_all_in_row_order() {
    let (_, store) = setup(vec![
        vec!["id", "name", "status"],
        vec!["1", "a"],
        vec!["2", "b", "x"],
        vec!["3", "c", "x"],
    ]);

    let records = store.select(SHEET, RANGE, None).await.unwrap();
    assert_eq!(
        vec![
            record(&[("id", "1"), ("name", "a"), ("status", "")]),
            record(&[("id", "2"), ("name", "b"), ("status", "x")]),
            record(&[("id", "3"), ("name", "c"), ("status", "x")]),
        ],
        records
    );
}

#[tokio::test]
async fn select_with_not_filter() {
    let (_, store) = setup(vec![
        vec!["id", "status"],
        vec!["1", "x"],
        vec!["2", "y"],
        vec!["3", "x"],
    ]);

    let filter = Filter::parse([("status__not", "x")]).unwrap();
    let records = store.select(SHEET, RANGE, Some(&filter)).await.unwrap();
    let ids: Vec<_> = records.iter().map(|r| r["id"].as_str()).collect();
    assert_eq!(vec!["2"], ids);
}

#[tokio::test]
async fn select_plain_key_is_strict() {
    let (_, store) = setup(vec![vec!["id"], vec!["3"], vec!["3.0"]]);

    let filter = Filter::parse([("id", "3")]).unwrap();
    let records = store.select(SHEET, RANGE, Some(&filter)).await.unwrap();
    assert_eq!(vec![record(&[("id", "3")])], records);
}

#[tokio::test]
async fn select_uses_formatted_values() {
    let (transport, store) = setup(vec![vec!["total"], vec!["=1+2"]]);
    transport.set_display(&target(), 1, 0, "3");

    let records = store.select(SHEET, RANGE, None).await.unwrap();
    assert_eq!(vec![record(&[("total", "3")])], records);
    assert_eq!(vec![(target(), RenderMode::Formatted)], transport.fetches());
    assert!(transport.writes().is_empty());
}

#[tokio::test]
async fn select_empty_range() {
    let (_, store) = setup(Vec::new());
    let records = store.select(SHEET, RANGE, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn select_combinators() {
    let (_, store) = setup(vec![
        vec!["id", "owner", "status"],
        vec!["1", "ann", "open"],
        vec!["2", "bob", "done"],
        vec!["3", "cat", "open"],
    ]);

    let filter = Filter::from_json(&json!({
        "owner__or__status": ["bob", "open"],
        "id__not": 3,
    }))
    .unwrap();
    let records = store.select(SHEET, RANGE, Some(&filter)).await.unwrap();
    let ids: Vec<_> = records.iter().map(|r| r["id"].as_str()).collect();
    assert_eq!(vec!["1", "2"], ids);
}

#[tokio::test]
async fn append_adds_after_last_row() {
    let (transport, store) = setup(tasks());

    store
        .append(SHEET, RANGE, &[record(&[("name", "c"), ("id", "3")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["1", "a", ""],
            vec!["2", "b", "x"],
            vec!["3", "c", ""],
        ],
        transport.values(&target())
    );
    assert_eq!(
        vec![WriteLog {
            target: target(),
            input: InputOption::UserEntered,
            rows: 4,
        }],
        transport.writes()
    );
}

#[tokio::test]
async fn insert_reuses_first_blank_row() {
    let (transport, store) = setup(vec![
        vec!["id", "name", "status"],
        vec!["1", "a", ""],
        vec!["", "", ""],
        vec!["3", "c", ""],
        vec!["", "", ""],
    ]);

    store
        .insert(SHEET, RANGE, &[record(&[("id", "9"), ("name", "z")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["1", "a", ""],
            vec!["9", "z", ""],
            vec!["3", "c", ""],
            vec!["", "", ""],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn insert_without_blank_appends() {
    let (transport, store) = setup(tasks());

    store
        .insert(SHEET, RANGE, &[record(&[("id", "3")])])
        .await
        .unwrap();

    let values = transport.values(&target());
    assert_eq!(4, values.len());
    assert_eq!(vec!["3", "", ""], values[3]);
}

#[tokio::test]
async fn prepend_places_beneath_header() {
    let (transport, store) = setup(tasks());

    let records = records_from_json(&json!([
        {"id": 10, "name": "p"},
        {"id": 11, "name": "q", "status": null},
    ]))
    .unwrap();
    store.prepend(SHEET, RANGE, &records).await.unwrap();

    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["10", "p", ""],
            vec!["11", "q", ""],
            vec!["1", "a", ""],
            vec!["2", "b", "x"],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn append_preserves_formulas() {
    let (transport, store) = setup(vec![vec!["id", "total"], vec!["1", "=A2*6"]]);
    transport.set_display(&target(), 1, 1, "6");

    store
        .append(SHEET, RANGE, &[record(&[("id", "2")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "total"],
            vec!["1", "=A2*6"],
            vec!["2", ""],
        ],
        transport.values(&target())
    );
    assert_eq!(vec![(target(), RenderMode::Formula)], transport.fetches());
}

#[tokio::test]
async fn insert_skips_rows_with_entered_formulas() {
    // Row 1 displays nothing but holds a formula, it isn't free.
    let (transport, store) = setup(vec![
        vec!["id", "total"],
        vec!["", "=IF(A2=\"\",\"\",1)"],
        vec!["", ""],
        vec!["3", "=A4*6"],
    ]);
    transport.set_display(&target(), 1, 1, "");
    transport.set_display(&target(), 3, 1, "18");

    store
        .insert(SHEET, RANGE, &[record(&[("id", "9")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "total"],
            vec!["", "=IF(A2=\"\",\"\",1)"],
            vec!["9", ""],
            vec!["3", "=A4*6"],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn prepend_preserves_formulas() {
    let (transport, store) = setup(vec![
        vec!["id", "total"],
        vec!["1", "=A2*6"],
        vec!["2", "=A3*6"],
    ]);
    transport.set_display(&target(), 1, 1, "6");
    transport.set_display(&target(), 2, 1, "12");

    store
        .prepend(SHEET, RANGE, &[record(&[("id", "0")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "total"],
            vec!["0", ""],
            vec!["1", "=A2*6"],
            vec!["2", "=A3*6"],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn inserts_require_header() {
    let (transport, store) = setup(Vec::new());
    let records = [record(&[("id", "1")])];

    for result in [
        store.append(SHEET, RANGE, &records).await,
        store.insert(SHEET, RANGE, &records).await,
        store.prepend(SHEET, RANGE, &records).await,
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, SheetStoreError::MissingHeader));
        assert_eq!("No header found.", err.to_string());
    }
    assert!(transport.writes().is_empty());
}

#[tokio::test]
async fn update_example() {
    let (transport, store) = setup(tasks());

    let filter = Filter::parse([("id", "2")]).unwrap();
    let updated = store
        .update(SHEET, RANGE, &filter, &record(&[("status", "y")]))
        .await
        .unwrap();

    assert_eq!(1, updated);
    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["1", "a", ""],
            vec!["2", "b", "y"],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn update_preserves_formulas() {
    let (transport, store) = setup(vec![
        vec!["id", "total", "status"],
        vec!["1", "=B1*2", "open"],
        vec!["3", "=B2*2", "open"],
    ]);
    transport.set_display(&target(), 1, 1, "12");
    transport.set_display(&target(), 2, 1, "24");

    let filter = Filter::parse([("id", "3")]).unwrap();
    store
        .update(SHEET, RANGE, &filter, &record(&[("status", "done")]))
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "total", "status"],
            vec!["1", "=B1*2", "open"],
            vec!["3", "=B2*2", "done"],
        ],
        transport.values(&target())
    );
    assert_eq!(
        vec![
            (target(), RenderMode::Formatted),
            (target(), RenderMode::Formula),
        ],
        transport.fetches()
    );
    assert_eq!(InputOption::UserEntered, transport.writes()[0].input);
}

#[tokio::test]
async fn update_matches_on_formatted_values() {
    let (transport, store) = setup(vec![
        vec!["total", "flag"],
        vec!["=1+1", ""],
        vec!["=2+2", ""],
    ]);
    transport.set_display(&target(), 1, 0, "2.00");
    transport.set_display(&target(), 2, 0, "4.00");

    // Loose equality lets "4" match the displayed "4.00".
    let filter = Filter::parse([("total", "4")]).unwrap();
    let updated = store
        .update(SHEET, RANGE, &filter, &record(&[("flag", "big")]))
        .await
        .unwrap();

    assert_eq!(1, updated);
    assert_eq!(
        vec![vec!["total", "flag"], vec!["=1+1", ""], vec!["=2+2", "big"]],
        transport.values(&target())
    );
}

#[tokio::test]
async fn update_with_raw_overwrite() {
    let (transport, store) = setup(tasks());
    let store = store.with_overwrite_input(InputOption::Raw);

    let filter = Filter::parse([("id", "1")]).unwrap();
    store
        .update(SHEET, RANGE, &filter, &record(&[("name", "=oops")]))
        .await
        .unwrap();

    assert_eq!(InputOption::Raw, transport.writes()[0].input);
}

#[tokio::test]
async fn update_no_match_writes_unchanged() {
    let (transport, store) = setup(tasks());

    let filter = Filter::parse([("id", "42")]).unwrap();
    let updated = store
        .update(SHEET, RANGE, &filter, &record(&[("status", "y")]))
        .await
        .unwrap();

    assert_eq!(0, updated);
    assert_eq!(tasks(), transport.values(&target()));
    assert_eq!(1, transport.writes().len());
}

#[tokio::test]
async fn update_empty_filter_touches_nothing() {
    let (transport, store) = setup(tasks());

    let updated = store
        .update(SHEET, RANGE, &Filter::empty(), &record(&[("status", "y")]))
        .await
        .unwrap();

    assert_eq!(0, updated);
    assert_eq!(tasks(), transport.values(&target()));
}

#[tokio::test]
async fn update_header_only_is_noop() {
    let (transport, store) = setup(vec![vec!["id", "status"]]);

    let filter = Filter::parse([("id", "1")]).unwrap();
    let updated = store
        .update(SHEET, RANGE, &filter, &record(&[("status", "y")]))
        .await
        .unwrap();

    assert_eq!(0, updated);
    assert!(transport.writes().is_empty());
    assert_eq!(1, transport.fetches().len());
}

#[tokio::test]
async fn update_and_delete_require_header() {
    let (_, store) = setup(Vec::new());
    let filter = Filter::parse([("id", "1")]).unwrap();

    let err = store
        .update(SHEET, RANGE, &filter, &record(&[("id", "2")]))
        .await
        .unwrap_err();
    assert!(matches!(err, SheetStoreError::MissingHeader));

    let err = store.delete(SHEET, RANGE, &filter).await.unwrap_err();
    assert!(matches!(err, SheetStoreError::MissingHeader));
}

#[tokio::test]
async fn delete_example() {
    let (transport, store) = setup(tasks());

    let filter = Filter::parse([("id", "1")]).unwrap();
    let cleared = store.delete(SHEET, RANGE, &filter).await.unwrap();

    assert_eq!(1, cleared);
    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["", "", ""],
            vec!["2", "b", "x"],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn delete_keeps_row_count_and_slot_is_reused() {
    let (transport, store) = setup(vec![
        vec!["id", "name", "status"],
        vec!["1", "a", ""],
        vec!["3", "c", "x"],
        vec!["4", "d", ""],
    ]);

    let filter = Filter::parse([("id", "3")]).unwrap();
    store.delete(SHEET, RANGE, &filter).await.unwrap();
    assert_eq!(4, transport.values(&target()).len());

    store
        .insert(SHEET, RANGE, &[record(&[("id", "5"), ("name", "e")])])
        .await
        .unwrap();

    assert_eq!(
        vec![
            vec!["id", "name", "status"],
            vec!["1", "a", ""],
            vec!["5", "e", ""],
            vec!["4", "d", ""],
        ],
        transport.values(&target())
    );
}

#[tokio::test]
async fn fetch_errors_propagate() {
    let (transport, store) = setup(tasks());
    transport.fail_next_fetch("permission denied");

    let err = store.select(SHEET, RANGE, None).await.unwrap_err();
    assert!(matches!(err, SheetStoreError::Transport(_)));
    assert_eq!("Injected failure: permission denied", err.to_string());
}

#[tokio::test]
async fn write_errors_propagate() {
    let (transport, store) = setup(tasks());
    transport.fail_next_write("quota exceeded");

    let filter = Filter::parse([("id", "1")]).unwrap();
    let err = store.delete(SHEET, RANGE, &filter).await.unwrap_err();
    assert!(matches!(err, SheetStoreError::Transport(_)));
    assert_eq!(tasks(), transport.values(&target()));
    assert!(transport.writes().is_empty());
}
