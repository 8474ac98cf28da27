use crate::host::{HostSession, QueryResult};
use crate::row::Row;
use bytes::Bytes;
use shared::ExtensionError::SubQueryFailed;
use shared::{ExtensionError, Value};
use std::collections::HashMap;
use std::sync::Mutex;

//Scripted in-memory host session. Stands in for the real engine
//connection in tests and the playground: sub-queries are looked up by
//their exact SQL text and replay a scripted outcome per execution.
//Execution counters make caching behavior observable.
pub struct MockSession {
    relations: Mutex<HashMap<String, Relation>>,
    scalars: Mutex<HashMap<String, Scalar>>,
}

enum RelationScript {
    Fixed(Vec<Row>),
    //One outcome per execution, the last one repeats
    Outcomes(Vec<Result<Vec<Row>, String>>),
    //A single row with one fresh 16 byte blob per execution
    RandomBlob,
}

struct Relation {
    columns: Vec<String>,
    script: RelationScript,
    executions: usize,
}

enum ScalarScript {
    Fixed(Value),
    Outcomes(Vec<Result<Value, String>>),
    RandomBlob,
}

struct Scalar {
    script: ScalarScript,
    executions: usize,
}

impl MockSession {
    pub fn create() -> MockSession {
        MockSession {
            relations: Mutex::new(HashMap::new()),
            scalars: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_relation(&mut self, sql: &str, columns: Vec<&str>, rows: Vec<Row>) {
        self.insert_relation(sql, columns, RelationScript::Fixed(rows));
    }

    pub fn add_relation_outcomes(&mut self, sql: &str, columns: Vec<&str>, outcomes: Vec<Result<Vec<Row>, String>>) {
        self.insert_relation(sql, columns, RelationScript::Outcomes(outcomes));
    }

    pub fn add_failing_relation(&mut self, sql: &str, columns: Vec<&str>, message: &str) {
        self.insert_relation(sql, columns, RelationScript::Outcomes(vec![Err(message.to_string())]));
    }

    pub fn add_random_blob_relation(&mut self, sql: &str, column: &str) {
        self.insert_relation(sql, vec![column], RelationScript::RandomBlob);
    }

    pub fn add_scalar(&mut self, sql: &str, value: Value) {
        self.insert_scalar(sql, ScalarScript::Fixed(value));
    }

    pub fn add_scalar_sequence(&mut self, sql: &str, values: Vec<Value>) {
        self.insert_scalar(sql, ScalarScript::Outcomes(values.into_iter().map(Ok).collect()));
    }

    pub fn add_scalar_outcomes(&mut self, sql: &str, outcomes: Vec<Result<Value, String>>) {
        self.insert_scalar(sql, ScalarScript::Outcomes(outcomes));
    }

    pub fn add_random_blob_scalar(&mut self, sql: &str) {
        self.insert_scalar(sql, ScalarScript::RandomBlob);
    }

    pub fn relation_executions(&self, sql: &str) -> usize {
        self.relations.lock().unwrap().get(sql).map(|relation| relation.executions).unwrap_or(0)
    }

    pub fn scalar_executions(&self, sql: &str) -> usize {
        self.scalars.lock().unwrap().get(sql).map(|scalar| scalar.executions).unwrap_or(0)
    }

    fn insert_relation(&mut self, sql: &str, columns: Vec<&str>, script: RelationScript) {
        self.relations.lock().unwrap().insert(sql.to_string(), Relation {
            columns: columns.into_iter().map(|column| column.to_string()).collect(),
            script,
            executions: 0,
        });
    }

    fn insert_scalar(&mut self, sql: &str, script: ScalarScript) {
        self.scalars.lock().unwrap().insert(sql.to_string(), Scalar {
            script,
            executions: 0,
        });
    }

    fn random_blob() -> Value {
        let mut blob = Vec::with_capacity(16);
        for _ in 0..16 {
            blob.push(rand::random::<u8>());
        }
        Value::create_blob(Bytes::from(blob))
    }
}

impl HostSession for MockSession {
    fn relation_schema(&self, sql: &str) -> Result<Vec<String>, ExtensionError> {
        let relations = self.relations.lock().unwrap();
        let relation = relations.get(sql)
            .ok_or_else(|| SubQueryFailed(sql.to_string(), "no such relation scripted".to_string()))?;

        Ok(relation.columns.clone())
    }

    fn select_rows(&self, sql: &str) -> Result<QueryResult, ExtensionError> {
        let mut relations = self.relations.lock().unwrap();
        let relation = relations.get_mut(sql)
            .ok_or_else(|| SubQueryFailed(sql.to_string(), "no such relation scripted".to_string()))?;

        relation.executions += 1;

        let rows = match &relation.script {
            RelationScript::Fixed(rows) => rows.clone(),
            RelationScript::Outcomes(outcomes) => {
                if outcomes.is_empty() {
                    return Err(SubQueryFailed(sql.to_string(), "no outcomes scripted".to_string()));
                }
                let outcome_index = (relation.executions - 1).min(outcomes.len() - 1);
                match &outcomes[outcome_index] {
                    Ok(rows) => rows.clone(),
                    Err(message) => return Err(SubQueryFailed(sql.to_string(), message.clone())),
                }
            },
            RelationScript::RandomBlob => vec![Row::create(vec![Self::random_blob()])],
        };

        Ok(QueryResult {
            columns: relation.columns.clone(),
            rows,
        })
    }

    fn select_scalar(&self, sql: &str) -> Result<Value, ExtensionError> {
        let mut scalars = self.scalars.lock().unwrap();
        let scalar = scalars.get_mut(sql)
            .ok_or_else(|| SubQueryFailed(sql.to_string(), "no such scalar scripted".to_string()))?;

        scalar.executions += 1;

        match &scalar.script {
            ScalarScript::Fixed(value) => Ok(value.clone()),
            ScalarScript::Outcomes(outcomes) => {
                if outcomes.is_empty() {
                    return Err(SubQueryFailed(sql.to_string(), "no outcomes scripted".to_string()));
                }
                let outcome_index = (scalar.executions - 1).min(outcomes.len() - 1);
                match &outcomes[outcome_index] {
                    Ok(value) => Ok(value.clone()),
                    Err(message) => Err(SubQueryFailed(sql.to_string(), message.clone())),
                }
            },
            ScalarScript::RandomBlob => Ok(Self::random_blob()),
        }
    }
}
