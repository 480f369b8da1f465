//! Behaviour every [`DocumentStore`] backend must share, exercised by each backend's tests.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use feedstore_core::{FieldValue, Record};

use crate::store::DocumentStore;

pub(crate) fn grid_record(datetime: &str, wind: i64) -> Record {
    let ts = NaiveDateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M").unwrap();
    let mut fields = IndexMap::new();
    fields.insert("Datetime".to_string(), FieldValue::Timestamp(ts));
    fields.insert("Wind".to_string(), FieldValue::Integer(wind));
    fields.insert("Load".to_string(), FieldValue::Integer(150));
    Record::new(&["Datetime"], fields).unwrap()
}

pub(crate) async fn idempotent_upsert(store: &dyn DocumentStore) {
    let record = grid_record("2020-01-01T00:00", 100);
    store.upsert(std::slice::from_ref(&record)).await.unwrap();
    let before = store.fetch_all().await.unwrap().len();

    store.upsert(std::slice::from_ref(&record)).await.unwrap();
    let after = store.fetch_all().await.unwrap();

    assert_eq!(before, 1);
    assert_eq!(after.len(), before);
    assert_eq!(after.records()[0], record);
}

pub(crate) async fn last_write_wins(store: &dyn DocumentStore) {
    store.upsert(&[grid_record("2020-01-01T00:00", 100)]).await.unwrap();
    store.upsert(&[grid_record("2020-01-01T00:00", 7)]).await.unwrap();

    let snapshot = store.fetch_all().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.records()[0].get("Wind"), Some(&FieldValue::Integer(7)));
}

pub(crate) async fn empty_sentinel(store: &dyn DocumentStore) {
    let snapshot = store.fetch_all().await.unwrap();
    assert!(snapshot.is_empty());

    store.upsert(&[grid_record("2020-01-01T00:00", 1)]).await.unwrap();
    let snapshot = store.fetch_all().await.unwrap();
    assert!(!snapshot.is_empty());
    assert_eq!(snapshot.len(), 1);
}

pub(crate) async fn summary_counts(store: &dyn DocumentStore) {
    let first = store
        .upsert(&[grid_record("2020-01-01T00:00", 1), grid_record("2020-01-01T00:05", 2)])
        .await
        .unwrap();
    assert_eq!((first.rows, first.updated, first.inserted), (2, 0, 2));

    let second = store
        .upsert(&[grid_record("2020-01-01T00:05", 3), grid_record("2020-01-01T00:10", 4)])
        .await
        .unwrap();
    assert_eq!((second.rows, second.updated, second.inserted), (2, 1, 1));

    let snapshot = store.fetch_all().await.unwrap();
    let keys: Vec<String> = snapshot.records().iter().map(|r| r.key().canonical()).collect();
    assert_eq!(keys, vec!["2020-01-01T00:00", "2020-01-01T00:05", "2020-01-01T00:10"]);
}

pub(crate) async fn composite_keys(store: &dyn DocumentStore) {
    let entry = |position: i64, track: &str, streams: i64| {
        let mut fields = IndexMap::new();
        fields.insert("date".to_string(), FieldValue::Text("2020-01-01".into()));
        fields.insert("position".to_string(), FieldValue::Integer(position));
        fields.insert("track_id".to_string(), FieldValue::Text(track.into()));
        fields.insert("streams".to_string(), FieldValue::Integer(streams));
        Record::new(&["date", "position", "track_id"], fields).unwrap()
    };

    store.upsert(&[entry(1, "a", 10), entry(2, "b", 5)]).await.unwrap();
    // Same rank, different track is a different observation.
    let summary = store.upsert(&[entry(1, "a", 11), entry(1, "b", 9)]).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.inserted, 1);

    let snapshot = store.fetch_all().await.unwrap();
    assert_eq!(snapshot.len(), 3);
    let first = &snapshot.records()[0];
    assert_eq!(first.key().canonical(), "2020-01-01|1|a");
    assert_eq!(first.get("streams"), Some(&FieldValue::Integer(11)));
}
