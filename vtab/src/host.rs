use crate::row::Row;
use shared::{ExtensionError, Value};

//Result of executing a relation-valued sub-query to completion
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

//The host engine connection, as seen by the extension modules. The
//host itself (parsing, planning, storage) lives outside this crate,
//modules only ever hand it SQL text they received as constructor
//arguments and read back values.
pub trait HostSession {
    //Column names of a relation without executing it. The host
    //prepares the statement but never steps it.
    fn relation_schema(&self, sql: &str) -> Result<Vec<String>, ExtensionError>;

    //Executes a relation-valued sub-query to completion
    fn select_rows(&self, sql: &str) -> Result<QueryResult, ExtensionError>;

    //Evaluates a scalar sub-expression
    fn select_scalar(&self, sql: &str) -> Result<Value, ExtensionError>;
}
