use crate::row::Row;
use shared::ExtensionError::{ColumnIndexOutOfBounds, CursorNotFiltered};
use shared::{ExtensionError, Value};
use std::sync::Arc;

//Frozen result set handed to a cursor at filter() time. The Arc lets
//the statement cache share one materialization between the slot and
//any number of open cursors, an overwrite of the slot swaps the Arc
//and leaves live snapshots untouched.
pub type RowSnapshot = Arc<Vec<Row>>;

//Shared iteration state of every virtual table cursor: after filter()
//produced a snapshot, the host drives next/eof/column/rowid over it.
pub struct ExecutionCursor {
    snapshot: Option<RowSnapshot>,
    next_index: usize,
    rowid: i64,
}

impl ExecutionCursor {
    pub fn create() -> ExecutionCursor {
        ExecutionCursor {
            snapshot: None,
            next_index: 0,
            rowid: 1,
        }
    }

    pub fn start(&mut self, snapshot: RowSnapshot) {
        self.snapshot = Some(snapshot);
        self.next_index = 0;
        self.rowid = 1;
    }

    pub fn next(&mut self) {
        self.next_index += 1;
        self.rowid += 1;
    }

    pub fn eof(&self) -> bool {
        match &self.snapshot {
            Some(snapshot) => self.next_index >= snapshot.len(),
            None => true,
        }
    }

    pub fn column(&self, column_index: usize) -> Result<&Value, ExtensionError> {
        let snapshot = self.snapshot.as_ref().ok_or(CursorNotFiltered)?;
        //Reading past eof means the host ignored eof(), not a user error
        let row = snapshot.get(self.next_index).ok_or(ExtensionError::Internal)?;

        row.get_value(column_index)
            .ok_or(ColumnIndexOutOfBounds(column_index, row.column_count()))
    }

    pub fn rowid(&self) -> i64 {
        self.rowid
    }

    pub fn release(&mut self) {
        self.snapshot = None;
    }
}
