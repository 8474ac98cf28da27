use std::fmt::{Debug, Formatter};

//Four way classification of extension errors. Schema errors abort the
//table declaration, the rest abort only the current statement.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    Schema,
    Usage,
    Execution,
    Algorithm,
}

pub enum ExtensionError {
    //Declaration time errors, the table is never created
    UnknownModule(String),
    MissingModuleArgument(&'static str),
    MalformedModuleArgument(String),
    SourceWithoutColumns(String),

    //Query time errors
    MissingRequiredConstraint(String), //Column name
    SubQueryFailed(String, String), //Sub-query SQL, error message
    MalformedRelationShape(String, usize, usize), //Relation SQL, expected columns, actual columns
    IllegalTypeOperation(&'static str),

    //These should not occur under correct inputs
    ColumnIndexOutOfBounds(usize, usize), //Requested index, column count
    CursorNotFiltered,
    Internal
}

impl ExtensionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtensionError::UnknownModule(_) => ErrorKind::Schema,
            ExtensionError::MissingModuleArgument(_) => ErrorKind::Schema,
            ExtensionError::MalformedModuleArgument(_) => ErrorKind::Schema,
            ExtensionError::SourceWithoutColumns(_) => ErrorKind::Schema,
            ExtensionError::MissingRequiredConstraint(_) => ErrorKind::Usage,
            ExtensionError::SubQueryFailed(_, _) => ErrorKind::Execution,
            ExtensionError::MalformedRelationShape(_, _, _) => ErrorKind::Execution,
            ExtensionError::IllegalTypeOperation(_) => ErrorKind::Execution,
            ExtensionError::ColumnIndexOutOfBounds(_, _) => ErrorKind::Algorithm,
            ExtensionError::CursorNotFiltered => ErrorKind::Algorithm,
            ExtensionError::Internal => ErrorKind::Algorithm,
        }
    }
}

impl Debug for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionError::UnknownModule(module_name) => {
                write!(f, "No module registered with name: {}", module_name)
            },
            ExtensionError::MissingModuleArgument(argument_name) => {
                write!(f, "Missing module argument: {}", argument_name)
            },
            ExtensionError::MalformedModuleArgument(raw_argument) => {
                write!(f, "Malformed module argument: {}. Expected name=(sub-expression)", raw_argument)
            },
            ExtensionError::SourceWithoutColumns(sql) => {
                write!(f, "Source relation produces no columns: {}", sql)
            },
            ExtensionError::MissingRequiredConstraint(column_name) => {
                write!(f, "Missing equality constraint on required column: {}", column_name)
            },
            ExtensionError::SubQueryFailed(sql, message) => {
                write!(f, "Sub-query failed: {}. SQL: {}", message, sql)
            },
            ExtensionError::MalformedRelationShape(sql, expected, actual) => {
                write!(f, "Relation has wrong shape. Expected {} columns, got {}. SQL: {}", expected, actual, sql)
            },
            ExtensionError::IllegalTypeOperation(message) => {
                write!(f, "Illegal type operation: {}", message)
            },
            ExtensionError::ColumnIndexOutOfBounds(requested, count) => {
                write!(f, "Column index {} out of bounds, table has {} columns", requested, count)
            },
            ExtensionError::CursorNotFiltered => {
                write!(f, "Cursor read before filter was called")
            },
            ExtensionError::Internal => {
                write!(f, "Internal error. Invalid code path")
            }
        }
    }
}
