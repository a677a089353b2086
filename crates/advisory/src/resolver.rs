//! Latest-state resolution per asset.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};

use agrimon_core::{AssetId, AssetRecord};

/// Most recent record per asset at or after `window_start` (inclusive).
///
/// Input may be unsorted and span assets. Latest = max timestamp; equal timestamps
/// go to the higher insertion `sequence`, then to the later input position.
/// Returns an empty map when nothing falls in the window.
pub fn resolve_latest<R: AssetRecord>(records: &[R], window_start: DateTime<Utc>) -> BTreeMap<AssetId, &R> {
    latest_where(records, |r| r.recorded_at() >= window_start)
}

/// Most recent record per asset over the whole history.
pub fn latest_by_asset<R: AssetRecord>(records: &[R]) -> BTreeMap<AssetId, &R> {
    latest_where(records, |_| true)
}

fn latest_where<R, F>(records: &[R], keep: F) -> BTreeMap<AssetId, &R>
where
    R: AssetRecord,
    F: Fn(&R) -> bool,
{
    let mut latest: BTreeMap<AssetId, (usize, &R)> = BTreeMap::new();

    for (pos, record) in records.iter().enumerate() {
        if !keep(record) {
            continue;
        }
        match latest.entry(record.asset_id()) {
            Entry::Vacant(slot) => {
                slot.insert((pos, record));
            }
            Entry::Occupied(mut slot) => {
                let (cur_pos, cur) = *slot.get();
                if rank(record, pos) > rank(cur, cur_pos) {
                    slot.insert((pos, record));
                }
            }
        }
    }

    latest.into_iter().map(|(id, (_, r))| (id, r)).collect()
}

fn rank<R: AssetRecord>(record: &R, pos: usize) -> (DateTime<Utc>, u64, usize) {
    (record.recorded_at(), record.sequence(), pos)
}
