use std::marker::PhantomData;

use colrepo_cluster::{Row, RowSet};
use colrepo_codec::JsonCodec;
use colrepo_types::Entity;

use crate::crud::decode_row;
use crate::error::RepoResult;

/// Values of a full-table read, decoded one row at a time.
///
/// Borrows the session that ran the query and cannot outlive it. Rows are
/// yielded in the store's native order, which is unspecified. Each item is
/// decoded when it is reached; a document that fails to decode yields an
/// `Err` for that row only. An empty table yields nothing.
///
/// The sequence is not restartable: run the query again for fresh rows.
pub struct Records<'s, V> {
    rows: std::vec::IntoIter<Row>,
    codec: JsonCodec,
    _session: PhantomData<&'s ()>,
    _value: PhantomData<fn() -> V>,
}

impl<'s, V: Entity> Records<'s, V> {
    pub(crate) fn new(rows: RowSet, codec: JsonCodec) -> Self {
        Self {
            rows: rows.into_iter(),
            codec,
            _session: PhantomData,
            _value: PhantomData,
        }
    }
}

impl<V: Entity> Iterator for Records<'_, V> {
    type Item = RepoResult<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(decode_row(&self.codec, &row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<V: Entity> ExactSizeIterator for Records<'_, V> {}

impl<V> std::fmt::Debug for Records<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("remaining", &self.rows.len())
            .finish()
    }
}
