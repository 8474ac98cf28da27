use shared::Value;
use std::fmt::{Display, Formatter};

//A single materialized row. Virtual table rows are always fully
//materialized before iteration, there is no lazy column decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn create(values: Vec<Value>) -> Row {
        Row { values }
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &Vec<Value> {
        &self.values
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.values.iter()
            .map(|value| value.to_string())
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}
