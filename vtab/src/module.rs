use crate::constraint_planner::QueryPlan;
use crate::execution_cursor::RowSnapshot;
use crate::host::HostSession;
use crate::schema::TableSchema;
use crate::table_arguments::TableArguments;
use shared::{ExtensionError, Value};
use std::sync::Arc;

//The host engine's callback driven virtual table protocol, recast as
//a trait set. One VirtualTableModule per registered module name, one
//VirtualTable per declared table, one TableCursor per statement
//execution. The runtime adapter owns the generic halves of the
//protocol (planning, iteration), modules only implement connect and
//filter.

pub trait VirtualTableModule {
    fn module_name(&self) -> &'static str;

    //Declaration time. Parses and validates constructor arguments and
    //builds the table instance, including its exposed schema. Fails
    //with a schema error when arguments are missing or malformed, in
    //which case the table is never created.
    fn connect(
        &self,
        session: Arc<dyn HostSession>,
        table_name: &str,
        arguments: &TableArguments,
    ) -> Result<Arc<dyn VirtualTable>, ExtensionError>;
}

pub trait VirtualTable {
    fn schema(&self) -> &TableSchema;

    fn open_cursor(&self) -> Box<dyn TableCursor>;
}

pub trait TableCursor {
    //Produces the frozen row set this cursor will iterate. Any state
    //the cursor reads after this call must live in the returned
    //snapshot, never in the table instance: another cursor of the
    //same table may run filter() while this one is still scanning.
    fn filter(
        &mut self,
        plan: &QueryPlan,
        arguments: &[Value],
    ) -> Result<RowSnapshot, ExtensionError>;
}
