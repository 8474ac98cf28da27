use crate::constraint_planner::{ColumnConstraint, ConstraintPlanner, QueryPlan};
use crate::execution_cursor::ExecutionCursor;
use crate::host::HostSession;
use crate::module::{TableCursor, VirtualTable, VirtualTableModule};
use crate::schema::TableSchema;
use crate::table_arguments::TableArguments;
use shared::ExtensionError::UnknownModule;
use shared::{logger, ExtensionError, ExtensionLayer, ExtensionOptions, Logger, Value};
use std::collections::HashMap;
use std::sync::Arc;

//Bridges the host engine's per row callback protocol to the module
//traits. The host drives: connect once per declaration, best_index
//once per statement, then open/filter/next/eof/column per cursor.
pub struct VirtualTableRuntime {
    modules: HashMap<String, Box<dyn VirtualTableModule>>,
}

impl VirtualTableRuntime {
    pub fn create(options: Arc<ExtensionOptions>) -> VirtualTableRuntime {
        Logger::init(options);

        VirtualTableRuntime {
            modules: HashMap::new(),
        }
    }

    pub fn register_module(&mut self, module: Box<dyn VirtualTableModule>) {
        logger().info(ExtensionLayer::Runtime, &format!("Registered module {}", module.module_name()));
        self.modules.insert(module.module_name().to_string(), module);
    }

    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn connect(
        &self,
        session: Arc<dyn HostSession>,
        module_name: &str,
        table_name: &str,
        raw_arguments: &[String],
    ) -> Result<TableHandle, ExtensionError> {
        let module = self.modules.get(module_name)
            .ok_or_else(|| UnknownModule(module_name.to_string()))?;

        let arguments = TableArguments::parse(raw_arguments)?;
        let table = module.connect(session, table_name, &arguments)?;

        logger().info(ExtensionLayer::Runtime,
                      &format!("Connected table {} using module {}", table_name, module_name));

        Ok(TableHandle {
            table_name: table_name.to_string(),
            table,
        })
    }
}

//One declared virtual table. May have any number of concurrently open
//cursors, each with its own private snapshot.
pub struct TableHandle {
    table_name: String,
    table: Arc<dyn VirtualTable>,
}

impl std::fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl TableHandle {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &TableSchema {
        self.table.schema()
    }

    pub fn best_index(&self, constraints: &[ColumnConstraint]) -> Result<QueryPlan, ExtensionError> {
        let plan = ConstraintPlanner::create(self.table.schema()).plan(constraints)?;

        logger().debug(ExtensionLayer::Planner,
                       &format!("Planned scan of {}: {:?} with {} pushed down lookups",
                                self.table_name, plan.scan_kind, plan.lookups.len()));

        Ok(plan)
    }

    pub fn open(&self) -> CursorHandle {
        CursorHandle {
            cursor: self.table.open_cursor(),
            execution: ExecutionCursor::create(),
        }
    }

    pub fn disconnect(self) {
        logger().info(ExtensionLayer::Runtime, &format!("Disconnected table {}", self.table_name));
    }
}

//One statement execution against a table. The generic iteration state
//lives here, the module cursor only materializes the snapshot.
pub struct CursorHandle {
    cursor: Box<dyn TableCursor>,
    execution: ExecutionCursor,
}

impl CursorHandle {
    pub fn filter(&mut self, plan: &QueryPlan, arguments: &[Value]) -> Result<(), ExtensionError> {
        let snapshot = self.cursor.filter(plan, arguments)?;
        self.execution.start(snapshot);
        Ok(())
    }

    pub fn next(&mut self) {
        self.execution.next();
    }

    pub fn eof(&self) -> bool {
        self.execution.eof()
    }

    pub fn column(&self, column_index: usize) -> Result<Value, ExtensionError> {
        self.execution.column(column_index).cloned()
    }

    pub fn rowid(&self) -> i64 {
        self.execution.rowid()
    }

    //Snapshot references must be released promptly when the host
    //closes the statement, not when the handle happens to be dropped
    pub fn close(mut self) {
        self.execution.release();
    }
}

#[cfg(test)]
mod test {
    use crate::constraint_planner::{decode_plan, encode_plan};
    use crate::mock_session::MockSession;
    use crate::modules::{DominatorTreeModule, StmtCacheModule};
    use crate::row::Row;
    use crate::runtime::VirtualTableRuntime;
    use shared::{ErrorKind, ExtensionOptions, Value};
    use std::sync::Arc;

    fn runtime_with_modules() -> VirtualTableRuntime {
        let mut runtime = VirtualTableRuntime::create(Arc::new(ExtensionOptions::default()));
        runtime.register_module(Box::new(StmtCacheModule::create()));
        runtime.register_module(Box::new(DominatorTreeModule::create()));
        runtime
    }

    #[test]
    fn registered_modules_are_listed_sorted() {
        let runtime = runtime_with_modules();

        assert_eq!(runtime.module_names(), vec!["dominator_tree", "stmt_cache"]);
    }

    #[test]
    fn unknown_module_is_a_schema_error() {
        let runtime = runtime_with_modules();
        let session = Arc::new(MockSession::create());

        let error = runtime.connect(session, "no_such_module", "t", &[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Schema);
    }

    #[test]
    fn full_protocol_round_trip() {
        let runtime = runtime_with_modules();

        let mut session = MockSession::create();
        session.add_relation("(SELECT a FROM t)", vec!["a"], vec![
            Row::create(vec![Value::create_i64(7)]),
            Row::create(vec![Value::create_i64(8)]),
        ]);
        session.add_scalar("(SELECT 1)", Value::create_i64(1));

        let table = runtime.connect(Arc::new(session), "stmt_cache", "cached", &[
            "(SELECT a FROM t)".to_string(),
            "key=(SELECT 1)".to_string(),
        ]).unwrap();

        assert_eq!(table.schema().column_count(), 2);
        assert_eq!(table.schema().column_index_by_name("a"), Some(1));

        //The plan survives the host's opaque string channel
        let plan = table.best_index(&[]).unwrap();
        let plan = decode_plan(&encode_plan(&plan).unwrap()).unwrap();

        let mut cursor = table.open();
        cursor.filter(&plan, &[]).unwrap();

        let mut seen = Vec::new();
        while !cursor.eof() {
            seen.push(cursor.column(1).unwrap().get_i64().unwrap());
            cursor.next();
        }
        assert_eq!(seen, vec![7, 8]);
        assert_eq!(cursor.rowid(), 3);

        cursor.close();
        table.disconnect();
    }
}
