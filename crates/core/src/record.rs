//! Record contract: asset scope + position in the append-only stream.

use chrono::{DateTime, Utc};

use crate::id::AssetId;

/// A timestamped, asset-scoped record from an append-only stream.
///
/// `sequence` is assigned by the store on append and is monotonically increasing
/// in insertion order. It breaks ties between records sharing a timestamp.
pub trait AssetRecord {
    fn asset_id(&self) -> AssetId;

    fn recorded_at(&self) -> DateTime<Utc>;

    fn sequence(&self) -> u64;
}

impl<R> AssetRecord for &R
where
    R: AssetRecord + ?Sized,
{
    fn asset_id(&self) -> AssetId {
        (**self).asset_id()
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        (**self).recorded_at()
    }

    fn sequence(&self) -> u64 {
        (**self).sequence()
    }
}
