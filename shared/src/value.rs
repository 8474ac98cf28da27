use crate::ExtensionError::IllegalTypeOperation;
use crate::{utils, ExtensionError};
use bytes::Bytes;

//The five storage classes carried by the host engine's value protocol
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Type {
    I64,
    F64,
    String,
    Blob,
    Null
}

impl Type {
    pub fn is_null(&self) -> bool {
        matches!(self, Type::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Type::I64) || matches!(self, Type::F64)
    }

    pub fn to_string(&self) -> String {
        match &self {
            Type::I64 => "I64".to_string(),
            Type::F64 => "F64".to_string(),
            Type::String => "String".to_string(),
            Type::Blob => "Blob".to_string(),
            Type::Null => "Null".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    value_type: Type,
    value_bytes: Bytes,
}

impl Value {
    pub fn create_i64(value_i64: i64) -> Value {
        Value {
            value_bytes: Bytes::from(value_i64.to_le_bytes().to_vec()),
            value_type: Type::I64,
        }
    }

    pub fn create_f64(value_f64: f64) -> Value {
        Value {
            value_bytes: Bytes::from(value_f64.to_le_bytes().to_vec()),
            value_type: Type::F64,
        }
    }

    pub fn create_string(string: String) -> Value {
        Value {
            value_bytes: Bytes::from(string.as_bytes().to_vec()),
            value_type: Type::String
        }
    }

    pub fn create_blob(blob: Bytes) -> Value {
        Value {
            value_bytes: blob,
            value_type: Type::Blob
        }
    }

    pub fn create_null() -> Value {
        Value {
            value_bytes: Bytes::from(vec![]),
            value_type: Type::Null
        }
    }

    pub fn get_bytes(&self) -> &Bytes {
        &self.value_bytes
    }

    pub fn get_type(&self) -> Type {
        self.value_type
    }

    pub fn get_i64(&self) -> Result<i64, ExtensionError> {
        match self.value_type {
            Type::I64 => Ok(utils::bytes_to_i64_le(&self.value_bytes)),
            Type::F64 => Ok(utils::bytes_to_f64_le(&self.value_bytes) as i64),
            Type::String |
            Type::Blob |
            Type::Null => Err(IllegalTypeOperation("Expected number type from value")),
        }
    }

    pub fn get_f64(&self) -> Result<f64, ExtensionError> {
        match self.value_type {
            Type::I64 => Ok(utils::bytes_to_i64_le(&self.value_bytes) as f64),
            Type::F64 => Ok(utils::bytes_to_f64_le(&self.value_bytes)),
            Type::String |
            Type::Blob |
            Type::Null => Err(IllegalTypeOperation("Expected number type from value")),
        }
    }

    pub fn get_string(&self) -> Result<String, ExtensionError> {
        match self.value_type {
            Type::String => String::from_utf8(self.value_bytes.to_vec())
                .map_err(|_| IllegalTypeOperation("Value bytes are not valid UTF-8")),
            _ => Err(IllegalTypeOperation("Expected string type"))
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value_type, Type::Null)
    }

    pub fn is_number(&self) -> bool {
        self.value_type.is_number()
    }

    pub fn is_integer_number(&self) -> bool {
        matches!(self.value_type, Type::I64)
    }

    //Typed SQL equality. NULL equals nothing, not even another NULL.
    //Numbers compare numerically across I64/F64, text and blobs are
    //byte exact and never equal to a value of another type.
    pub fn sql_eq(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        if self.is_number() && other.is_number() {
            if self.is_integer_number() && other.is_integer_number() {
                return utils::bytes_to_i64_le(&self.value_bytes) == utils::bytes_to_i64_le(&other.value_bytes);
            }
            //Mixed widths go through f64, the widest representation
            return self.get_f64().unwrap() == other.get_f64().unwrap();
        }

        utils::enum_eq(&self.value_type, &other.value_type) && self.value_bytes == other.value_bytes
    }

    pub fn to_string(&self) -> String {
        match &self.value_type {
            Type::I64 => utils::bytes_to_i64_le(&self.value_bytes).to_string(),
            Type::F64 => utils::bytes_to_f64_le(&self.value_bytes).to_string(),
            Type::String => String::from_utf8_lossy(&self.value_bytes).to_string(),
            Type::Blob => format!("{:02X?}", self.value_bytes),
            Type::Null => "Null".to_string()
        }
    }
}

#[cfg(test)]
mod test {
    use crate::Value;
    use bytes::Bytes;

    #[test]
    fn null_equals_nothing() {
        assert!(!Value::create_null().sql_eq(&Value::create_null()));
        assert!(!Value::create_null().sql_eq(&Value::create_i64(0)));
        assert!(!Value::create_i64(0).sql_eq(&Value::create_null()));
    }

    #[test]
    fn numbers_compare_across_types() {
        assert!(Value::create_i64(1).sql_eq(&Value::create_i64(1)));
        assert!(Value::create_i64(1).sql_eq(&Value::create_f64(1.0)));
        assert!(!Value::create_i64(1).sql_eq(&Value::create_f64(1.5)));
        assert!(!Value::create_i64(1).sql_eq(&Value::create_i64(2)));
    }

    #[test]
    fn blobs_are_byte_exact() {
        let a = Value::create_blob(Bytes::from(vec![1, 2, 3]));
        let b = Value::create_blob(Bytes::from(vec![1, 2, 3]));
        let c = Value::create_blob(Bytes::from(vec![1, 2, 4]));

        assert!(a.sql_eq(&b));
        assert!(!a.sql_eq(&c));
    }

    #[test]
    fn text_never_equals_blob() {
        let text = Value::create_string(String::from("abc"));
        let blob = Value::create_blob(Bytes::from("abc".as_bytes().to_vec()));

        assert!(!text.sql_eq(&blob));
    }
}
