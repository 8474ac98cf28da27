use crate::schema::TableSchema;
use serde::{Deserialize, Serialize};
use shared::ExtensionError;
use shared::ExtensionError::MissingRequiredConstraint;

//Constraint operators of the host protocol. Only equality is ever
//pushed down, the rest always degrade to a full scan with host side
//post-filtering.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConstraintOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    IsNull,
    IsNotNull,
}

//One predicate the host query supplies against a table column. The
//host marks constraints it cannot hand over (e.g. from an outer join)
//as not usable.
#[derive(Copy, Clone, Debug)]
pub struct ColumnConstraint {
    pub column_index: usize,
    pub op: ConstraintOp,
    pub usable: bool,
}

//An equality lookup the plan pushes down: at filter() time the bound
//value for column_index arrives at argument_index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlannedLookup {
    pub column_index: usize,
    pub argument_index: usize,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanKind {
    KeyLookup,
    Full,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub scan_kind: ScanKind,
    pub lookups: Vec<PlannedLookup>,
    pub estimated_cost: f64,
    pub estimated_rows: u64,
    pub order_consumed: bool,
}

impl QueryPlan {
    pub fn argument_for_column(&self, column_index: usize) -> Option<usize> {
        self.lookups.iter()
            .find(|lookup| lookup.column_index == column_index)
            .map(|lookup| lookup.argument_index)
    }
}

const KEY_LOOKUP_COST: f64 = 10.0;
const KEY_LOOKUP_ROWS: u64 = 25;
const FULL_SCAN_COST: f64 = 1e6;
const FULL_SCAN_ROWS: u64 = 100_000;

pub struct ConstraintPlanner<'a> {
    schema: &'a TableSchema,
}

impl<'a> ConstraintPlanner<'a> {
    pub fn create(schema: &'a TableSchema) -> ConstraintPlanner<'a> {
        ConstraintPlanner { schema }
    }

    //Marks every usable equality constraint on a pushdown column as a
    //lookup and assigns it the next host argument slot. A required
    //column left without such a constraint makes the whole plan
    //unusable, which the host surfaces as a statement error.
    pub fn plan(&self, constraints: &[ColumnConstraint]) -> Result<QueryPlan, ExtensionError> {
        let mut lookups = Vec::new();
        let mut next_argument_index = 0;

        for (column_index, column) in self.schema.columns().iter().enumerate() {
            let equality = constraints.iter().find(|constraint| {
                constraint.column_index == column_index
                    && constraint.usable
                    && matches!(constraint.op, ConstraintOp::Equal)
            });

            match equality {
                Some(_) if column.pushdown => {
                    lookups.push(PlannedLookup {
                        column_index,
                        argument_index: next_argument_index,
                    });
                    next_argument_index += 1;
                },
                _ if column.required => {
                    return Err(MissingRequiredConstraint(column.name.clone()));
                },
                _ => {}
            }
        }

        if lookups.is_empty() {
            Ok(QueryPlan {
                scan_kind: ScanKind::Full,
                lookups,
                estimated_cost: FULL_SCAN_COST,
                estimated_rows: FULL_SCAN_ROWS,
                order_consumed: false,
            })
        } else {
            Ok(QueryPlan {
                scan_kind: ScanKind::KeyLookup,
                lookups,
                estimated_cost: KEY_LOOKUP_COST,
                estimated_rows: KEY_LOOKUP_ROWS,
                order_consumed: false,
            })
        }
    }

}

//The host carries the plan between best_index and filter as an opaque
//string. Round-tripping through JSON keeps the adapter stateless.
pub fn encode_plan(plan: &QueryPlan) -> Result<String, ExtensionError> {
    serde_json::to_string(plan).map_err(|_| ExtensionError::Internal)
}

pub fn decode_plan(encoded: &str) -> Result<QueryPlan, ExtensionError> {
    serde_json::from_str(encoded).map_err(|_| ExtensionError::Internal)
}
