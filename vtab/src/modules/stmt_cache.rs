use crate::constraint_planner::QueryPlan;
use crate::execution_cursor::RowSnapshot;
use crate::host::HostSession;
use crate::module::{TableCursor, VirtualTable, VirtualTableModule};
use crate::row::Row;
use crate::schema::{TableColumn, TableSchema};
use crate::table_arguments::TableArguments;
use shared::ExtensionError::{MalformedRelationShape, MissingModuleArgument, SourceWithoutColumns};
use shared::{logger, ExtensionError, ExtensionLayer, Value};
use std::sync::{Arc, Mutex};

pub const STMT_CACHE_MODULE_NAME: &str = "stmt_cache";

//Memoized execution of an arbitrary sub-query. The table holds a
//single (key, rows) slot: a scan whose key matches the slot replays
//the materialized rows without touching the source, any other key
//re-executes the source and replaces the slot wholesale. Invalidation
//is entirely caller controlled through the key expression, the module
//applies no staleness heuristics of its own.
//
//Declared as: stmt_cache((<source relation>), key=(<scalar expr>))
pub struct StmtCacheModule;

impl StmtCacheModule {
    pub fn create() -> StmtCacheModule {
        StmtCacheModule
    }
}

impl VirtualTableModule for StmtCacheModule {
    fn module_name(&self) -> &'static str {
        STMT_CACHE_MODULE_NAME
    }

    fn connect(
        &self,
        session: Arc<dyn HostSession>,
        table_name: &str,
        arguments: &TableArguments,
    ) -> Result<Arc<dyn VirtualTable>, ExtensionError> {
        let source_sql = arguments.positional(0)
            .ok_or(MissingModuleArgument("source"))?
            .to_string();
        let key_sql = arguments.named_or_err("key")?.to_string();

        //Prepare-only probe, the source must not run at declaration time
        let source_columns = session.relation_schema(&source_sql)?;
        if source_columns.is_empty() {
            return Err(SourceWithoutColumns(source_sql));
        }

        //The hidden key column is constrainable but stays out of
        //SELECT *, the visible columns are the source's, verbatim
        let mut columns = vec![TableColumn::create_pushdown("key", true, false)];
        for source_column in &source_columns {
            columns.push(TableColumn::create(source_column));
        }

        Ok(Arc::new(StmtCacheTable {
            table_name: table_name.to_string(),
            session,
            source_sql,
            key_sql,
            source_column_count: source_columns.len(),
            schema: TableSchema::create(columns),
            slot: Arc::new(Mutex::new(None)),
        }))
    }
}

struct CacheEntry {
    key: Value,
    //Full width rows (key prepended), shared by Arc with every cursor
    //that scanned this entry
    rows: RowSnapshot,
}

pub struct StmtCacheTable {
    table_name: String,
    session: Arc<dyn HostSession>,
    source_sql: String,
    key_sql: String,
    source_column_count: usize,
    schema: TableSchema,
    slot: Arc<Mutex<Option<CacheEntry>>>,
}

impl VirtualTable for StmtCacheTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn open_cursor(&self) -> Box<dyn TableCursor> {
        Box::new(StmtCacheCursor {
            table_name: self.table_name.clone(),
            session: self.session.clone(),
            source_sql: self.source_sql.clone(),
            key_sql: self.key_sql.clone(),
            source_column_count: self.source_column_count,
            slot: self.slot.clone(),
        })
    }
}

struct StmtCacheCursor {
    table_name: String,
    session: Arc<dyn HostSession>,
    source_sql: String,
    key_sql: String,
    source_column_count: usize,
    slot: Arc<Mutex<Option<CacheEntry>>>,
}

impl TableCursor for StmtCacheCursor {
    fn filter(&mut self, plan: &QueryPlan, arguments: &[Value]) -> Result<RowSnapshot, ExtensionError> {
        //The key either arrives pushed down from a WHERE key = ...
        //predicate or the declared key expression is re-evaluated
        let new_key = match plan.argument_for_column(0) {
            Some(argument_index) => arguments.get(argument_index)
                .cloned()
                .ok_or(ExtensionError::Internal)?,
            None => self.session.select_scalar(&self.key_sql)?,
        };

        //A NULL key never matches, not even a previously stored NULL
        {
            let slot = self.slot.lock().unwrap();
            if let Some(entry) = slot.as_ref() {
                if !new_key.is_null() && new_key.sql_eq(&entry.key) {
                    logger().debug(ExtensionLayer::Module(self.table_name.clone()),
                                   "Cache hit, replaying materialized rows");
                    return Ok(entry.rows.clone());
                }
            }
            //The overwrite begins here: the stale entry is taken out
            //before the source runs, so a failing source leaves the
            //slot empty and the next scan recomputes
        }
        self.slot.lock().unwrap().take();

        logger().debug(ExtensionLayer::Module(self.table_name.clone()),
                       "Cache miss, executing source relation");

        //The slot mutex is not held across the sub-query: the source
        //may itself open cursors on other virtual tables
        let result = self.session.select_rows(&self.source_sql)?;

        let mut materialized = Vec::with_capacity(result.rows.len());
        for row in result.rows {
            if row.column_count() != self.source_column_count {
                return Err(MalformedRelationShape(
                    self.source_sql.clone(),
                    self.source_column_count,
                    row.column_count(),
                ));
            }

            let mut values = Vec::with_capacity(1 + row.column_count());
            values.push(new_key.clone());
            values.extend(row.values().iter().cloned());
            materialized.push(Row::create(values));
        }

        let snapshot: RowSnapshot = Arc::new(materialized);

        *self.slot.lock().unwrap() = Some(CacheEntry {
            key: new_key,
            rows: snapshot.clone(),
        });

        Ok(snapshot)
    }
}

#[cfg(test)]
mod test {
    use crate::constraint_planner::{ColumnConstraint, ConstraintOp};
    use crate::mock_session::MockSession;
    use crate::modules::StmtCacheModule;
    use crate::row::Row;
    use crate::runtime::{TableHandle, VirtualTableRuntime};
    use shared::{ErrorKind, ExtensionOptions, Value};
    use std::sync::Arc;

    const SOURCE: &str = "(SELECT RANDOMBLOB(16) AS rand)";
    const CONSTANT_KEY: &str = "(SELECT 1)";
    const RANDOM_KEY: &str = "(SELECT RANDOMBLOB(16))";

    fn runtime() -> VirtualTableRuntime {
        let mut runtime = VirtualTableRuntime::create(Arc::new(ExtensionOptions::default()));
        runtime.register_module(Box::new(StmtCacheModule::create()));
        runtime
    }

    fn connect(runtime: &VirtualTableRuntime, session: Arc<MockSession>, key_sql: &str) -> TableHandle {
        runtime.connect(session, "stmt_cache", "t", &[
            SOURCE.to_string(),
            format!("key={}", key_sql),
        ]).unwrap()
    }

    fn scan(table: &TableHandle) -> Vec<Row> {
        let plan = table.best_index(&[]).unwrap();
        let mut cursor = table.open();
        cursor.filter(&plan, &[]).unwrap();

        let mut rows = Vec::new();
        while !cursor.eof() {
            let mut values = Vec::new();
            for column_index in 0..table.schema().column_count() {
                values.push(cursor.column(column_index).unwrap());
            }
            rows.push(Row::create(values));
            cursor.next();
        }
        cursor.close();
        rows
    }

    #[test]
    fn constant_key_replays_identical_rows() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_random_blob_relation(SOURCE, "rand");
        session.add_scalar(CONSTANT_KEY, Value::create_i64(1));
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), CONSTANT_KEY);

        let first = scan(&table);
        let second = scan(&table);

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(session.relation_executions(SOURCE), 1);
    }

    #[test]
    fn fresh_random_key_recomputes_every_scan() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_random_blob_relation(SOURCE, "rand");
        session.add_random_blob_scalar(RANDOM_KEY);
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), RANDOM_KEY);

        let first = scan(&table);
        let second = scan(&table);

        assert_ne!(first, second);
        assert_eq!(session.relation_executions(SOURCE), 2);
    }

    #[test]
    fn null_key_never_matches() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_random_blob_relation(SOURCE, "rand");
        session.add_scalar(CONSTANT_KEY, Value::create_null());
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), CONSTANT_KEY);

        scan(&table);
        scan(&table);

        assert_eq!(session.relation_executions(SOURCE), 2);
    }

    #[test]
    fn pushed_down_key_overrides_the_key_expression() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_random_blob_relation(SOURCE, "rand");
        session.add_scalar(CONSTANT_KEY, Value::create_i64(1));
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), CONSTANT_KEY);

        let plan = table.best_index(&[ColumnConstraint {
            column_index: 0,
            op: ConstraintOp::Equal,
            usable: true,
        }]).unwrap();

        let mut cursor = table.open();
        cursor.filter(&plan, &[Value::create_i64(42)]).unwrap();
        assert_eq!(cursor.column(0).unwrap().get_i64().unwrap(), 42);
        cursor.close();

        //The declared key expression was never consulted
        assert_eq!(session.scalar_executions(CONSTANT_KEY), 0);

        let mut cursor = table.open();
        cursor.filter(&plan, &[Value::create_i64(42)]).unwrap();
        cursor.close();

        assert_eq!(session.relation_executions(SOURCE), 1);
    }

    #[test]
    fn open_cursor_keeps_its_snapshot_across_slot_overwrites() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_relation_outcomes(SOURCE, vec!["rand"], vec![
            Ok(vec![Row::create(vec![Value::create_i64(100)])]),
            Ok(vec![Row::create(vec![Value::create_i64(200)])]),
        ]);
        session.add_scalar_sequence(CONSTANT_KEY, vec![
            Value::create_i64(1),
            Value::create_i64(2),
            Value::create_i64(2),
        ]);
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), CONSTANT_KEY);
        let plan = table.best_index(&[]).unwrap();

        //Outer cursor captures the key=1 snapshot
        let mut outer = table.open();
        outer.filter(&plan, &[]).unwrap();

        //Inner cursor overwrites the slot with the key=2 rows
        let mut inner = table.open();
        inner.filter(&plan, &[]).unwrap();
        assert_eq!(inner.column(1).unwrap().get_i64().unwrap(), 200);
        inner.close();

        //The outer cursor still yields the rows it captured
        assert_eq!(outer.column(1).unwrap().get_i64().unwrap(), 100);
        outer.close();
    }

    #[test]
    fn failed_refill_leaves_the_slot_empty() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_relation_outcomes(SOURCE, vec!["rand"], vec![
            Ok(vec![Row::create(vec![Value::create_i64(100)])]),
            Err("disk exploded".to_string()),
            Ok(vec![Row::create(vec![Value::create_i64(300)])]),
        ]);
        session.add_scalar_sequence(CONSTANT_KEY, vec![
            Value::create_i64(1),
            Value::create_i64(2),
            Value::create_i64(1),
        ]);
        let session = Arc::new(session);

        let table = connect(&runtime, session.clone(), CONSTANT_KEY);
        let plan = table.best_index(&[]).unwrap();

        let mut cursor = table.open();
        cursor.filter(&plan, &[]).unwrap();
        cursor.close();

        //The key=2 refill fails mid way, the table stays usable
        let mut cursor = table.open();
        let error = cursor.filter(&plan, &[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Execution);
        cursor.close();

        //Key 1 again: the slot was emptied by the failed refill, so
        //the source runs again instead of replaying stale rows
        let mut cursor = table.open();
        cursor.filter(&plan, &[]).unwrap();
        assert_eq!(cursor.column(1).unwrap().get_i64().unwrap(), 300);
        cursor.close();

        assert_eq!(session.relation_executions(SOURCE), 3);
    }

    #[test]
    fn missing_arguments_fail_at_declaration() {
        let runtime = runtime();
        let session = Arc::new(MockSession::create());

        let error = runtime.connect(session.clone(), "stmt_cache", "t", &[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Schema);

        let error = runtime.connect(session, "stmt_cache", "t", &[SOURCE.to_string()]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Schema);
    }

    #[test]
    fn source_shape_change_is_an_execution_error() {
        let runtime = runtime();
        let mut session = MockSession::create();
        session.add_relation_outcomes(SOURCE, vec!["rand"], vec![
            Ok(vec![Row::create(vec![Value::create_i64(1), Value::create_i64(2)])]),
        ]);
        session.add_scalar(CONSTANT_KEY, Value::create_i64(1));
        let session = Arc::new(session);

        let table = connect(&runtime, session, CONSTANT_KEY);
        let plan = table.best_index(&[]).unwrap();

        let mut cursor = table.open();
        let error = cursor.filter(&plan, &[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Execution);
    }
}
