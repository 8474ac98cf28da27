use shared::Value;
use std::sync::Arc;
use vtab::modules::{DominatorTreeModule, StmtCacheModule};
use vtab::{ColumnConstraint, ConstraintOp, MockSession, Row, TableHandle, VirtualTableRuntime};

fn main() {
    let mut runtime = VirtualTableRuntime::create(Arc::new(shared::start_extension_options_builder()
        .use_debug_logging(true)
        .build()));

    runtime.register_module(Box::new(StmtCacheModule::create()));
    runtime.register_module(Box::new(DominatorTreeModule::create()));

    let mut session = MockSession::create();
    session.add_random_blob_relation("(SELECT RANDOMBLOB(16) AS rand)", "rand");
    session.add_scalar("(SELECT 1)", Value::create_i64(1));
    session.add_relation("(SELECT tail, head FROM edges)", vec!["tail", "head"], vec![
        Row::create(vec![Value::create_i64(0), Value::create_i64(1)]),
        Row::create(vec![Value::create_i64(1), Value::create_i64(2)]),
        Row::create(vec![Value::create_i64(2), Value::create_i64(3)]),
        Row::create(vec![Value::create_i64(1), Value::create_i64(3)]),
    ]);
    let session = Arc::new(session);

    let cached = runtime.connect(session.clone(), "stmt_cache", "cached_random", &[
        "(SELECT RANDOMBLOB(16) AS rand)".to_string(),
        "key=(SELECT 1)".to_string(),
    ]).expect("declare stmt_cache table");

    println!("Two scans of a cached non-deterministic source, same key:");
    print_all(&cached, &[]);
    print_all(&cached, &[]);

    let dominators = runtime.connect(session, "dominator_tree", "dom", &[
        "edges=(SELECT tail, head FROM edges)".to_string(),
    ]).expect("declare dominator_tree table");

    println!("Immediate dominators from root 0:");
    print_all(&dominators, &[ColumnConstraint {
        column_index: 0,
        op: ConstraintOp::Equal,
        usable: true,
    }]);
}

fn print_all(table: &TableHandle, constraints: &[ColumnConstraint]) {
    let plan = table.best_index(constraints).expect("plan scan");
    let mut cursor = table.open();

    let arguments: Vec<Value> = plan.lookups.iter()
        .map(|_| Value::create_i64(0))
        .collect();

    cursor.filter(&plan, &arguments).expect("filter");

    while !cursor.eof() {
        let mut values = Vec::new();
        for column_index in 0..table.schema().column_count() {
            values.push(cursor.column(column_index).expect("column"));
        }
        println!("  {}", Row::create(values));
        cursor.next();
    }
    cursor.close();
}
