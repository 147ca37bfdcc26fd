use proptest::prelude::*;
use rowset_core::{DataKind, RowStateMask, RowVersion, Value};
use rowset_engine::{ColumnDef, MergeOptions, SortKey, Table, TableSet};
use std::cmp::Ordering;

fn two_column_table(rows: &[(i32, i32)]) -> Table {
    let mut t = Table::new("t").unwrap();
    t.add_column(ColumnDef::new("a", DataKind::Int32)).unwrap();
    t.add_column(ColumnDef::new("b", DataKind::Int32)).unwrap();
    for (a, b) in rows {
        t.add_row_values(vec![Value::Int32(*a), Value::Int32(*b)])
            .unwrap();
    }
    t.accept_changes().unwrap();
    t
}

proptest! {
    #[test]
    fn select_agrees_with_scan(rows in prop::collection::vec((0i32..20, 0i32..6), 0..40)) {
        let t = two_column_table(&rows);
        let sort = [SortKey::asc("a"), SortKey::desc("b")];
        let selected = t.select(None, &sort, RowStateMask::LIVE).unwrap();
        let scanned = t.scan(None, RowStateMask::LIVE).unwrap();

        let mut s1 = selected.clone();
        let mut s2 = scanned;
        s1.sort_unstable();
        s2.sort_unstable();
        prop_assert_eq!(s1, s2);

        // And the index order matches a reference sort
        let keys: Vec<(i32, i32)> = selected
            .iter()
            .map(|&r| {
                let a = t.get_value(r, "a", RowVersion::Default).unwrap();
                let b = t.get_value(r, "b", RowVersion::Default).unwrap();
                match (a, b) {
                    (Value::Int32(a), Value::Int32(b)) => (a, b),
                    _ => unreachable!(),
                }
            })
            .collect();
        for pair in keys.windows(2) {
            let ord = pair[0].0.cmp(&pair[1].0).then(pair[1].1.cmp(&pair[0].1));
            prop_assert_ne!(ord, Ordering::Greater);
        }
    }

    #[test]
    fn deletions_partition_masks(rows in prop::collection::vec((0i32..20, 0i32..6), 1..30),
                                 picks in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut t = two_column_table(&rows);
        let all = t.rows();
        let mut deleted = Vec::new();
        for (i, &row) in all.iter().enumerate() {
            if picks.get(i).copied().unwrap_or(false) {
                t.delete_row(row).unwrap();
                deleted.push(row);
            }
        }
        let live = t.select(None, &[SortKey::asc("a")], RowStateMask::LIVE).unwrap();
        let gone = t.select(None, &[SortKey::asc("a")], RowStateMask::DELETED).unwrap();
        prop_assert_eq!(live.len() + gone.len(), all.len());
        for row in &deleted {
            prop_assert!(gone.contains(row));
            prop_assert!(!live.contains(row));
        }
    }

    #[test]
    fn auto_increment_stays_unique(explicit in prop::collection::vec(prop::option::of(0i64..100), 1..40)) {
        let mut t = Table::new("t").unwrap();
        t.add_column(ColumnDef::new("id", DataKind::Int64).auto_increment(1, 1)).unwrap();
        t.set_primary_key(vec!["id".into()]).unwrap();

        let mut generated = Vec::new();
        for value in explicit {
            let staged = match value {
                Some(v) => vec![Value::Int64(v)],
                None => vec![Value::Null],
            };
            // Explicit values may collide with earlier rows; those are
            // rejected and must not disturb the sequence.
            if let Ok(row) = t.add_row_values(staged) {
                if value.is_none() {
                    match t.get_value(row, "id", RowVersion::Default).unwrap() {
                        Value::Int64(v) => generated.push(v),
                        _ => unreachable!(),
                    }
                }
            }
        }
        for pair in generated.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        // Uniqueness held throughout
        let mut ids: Vec<Value> = t
            .rows()
            .iter()
            .map(|&r| t.get_value(r, "id", RowVersion::Default).unwrap())
            .collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), before);
    }

    #[test]
    fn merge_twice_equals_merge_once(rows in prop::collection::vec((0i32..50, 0i32..100), 0..30)) {
        let mut source = TableSet::new("src").unwrap();
        let mut items = Table::new("items").unwrap();
        items.add_column(ColumnDef::new("id", DataKind::Int32)).unwrap();
        items.add_column(ColumnDef::new("count", DataKind::Int32)).unwrap();
        items.set_primary_key(vec!["id".into()]).unwrap();
        source.add_table(items).unwrap();
        for (id, count) in &rows {
            // Later duplicates of a key lose; only distinct ids survive
            let _ = source.add_row_values("items", vec![Value::Int32(*id), Value::Int32(*count)]);
        }
        source.accept_changes().unwrap();

        let mut target = TableSet::new("dst").unwrap();
        target.merge(&source, &MergeOptions::default()).unwrap();
        let first: Vec<(Value, Value)> = snapshot(&target);
        target.merge(&source, &MergeOptions::default()).unwrap();
        prop_assert_eq!(snapshot(&target), first);
    }
}

fn snapshot(set: &TableSet) -> Vec<(Value, Value)> {
    let items = set.table("items").unwrap();
    let mut out: Vec<(Value, Value)> = items
        .rows()
        .iter()
        .map(|&r| {
            (
                items.get_value(r, "id", RowVersion::Default).unwrap(),
                items.get_value(r, "count", RowVersion::Default).unwrap(),
            )
        })
        .collect();
    out.sort();
    out
}
