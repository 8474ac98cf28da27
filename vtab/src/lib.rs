mod constraint_planner;
mod execution_cursor;
mod host;
mod mock_session;
mod module;
mod row;
mod runtime;
mod schema;
mod table_arguments;

pub mod modules;

pub use constraint_planner::*;
pub use execution_cursor::*;
pub use host::*;
pub use mock_session::MockSession;
pub use module::*;
pub use row::Row;
pub use runtime::*;
pub use schema::*;
pub use table_arguments::TableArguments;
