use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A variable's runtime value. Text is shared so per-tick copies of a
/// texture path stay cheap.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(Arc<str>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    Text,
}

impl Value {
    pub fn text(text: &str) -> Self {
        Value::Text(Arc::from(text))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Number,
            Value::Text(_) => ValueType::Text,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    /// Numbers are truthy iff they are not zero. NaN counts as truthy.
    pub fn is_truthy(&self) -> Option<bool> {
        self.as_number().map(|n| n != 0.0)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Text => "text",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    Undeclared { name: String },
    TypeChanged { name: String, declared: ValueType, found: ValueType },
}

impl FrameError {
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::Undeclared { .. } => "E_FRAME_UNDECLARED",
            FrameError::TypeChanged { .. } => "E_FRAME_TYPE_CHANGED",
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Undeclared { name } => {
                write!(f, "{} variable `{}` is not declared in the frame", self.code(), name)
            }
            FrameError::TypeChanged { name, declared, found } => write!(
                f,
                "{} variable `{}` is declared {} but got {}",
                self.code(),
                name,
                declared,
                found
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// One instance's private variable store. The set of names and each name's
/// type are fixed once the frame is built; `assign` never adds a name and
/// never changes a type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableFrame {
    vars: BTreeMap<String, Value>,
}

impl VariableFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used while the schema is still open.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.declare(name, value.into());
        self
    }

    /// Declares `name` or replaces its value outright, type included.
    pub fn declare(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn type_of(&self, name: &str) -> Option<ValueType> {
        self.get(name).map(Value::value_type)
    }

    /// Writes into an existing variable of the same type.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), FrameError> {
        let slot = self.vars.get_mut(name).ok_or_else(|| FrameError::Undeclared {
            name: name.to_string(),
        })?;
        let declared = slot.value_type();
        let found = value.value_type();
        if declared != found {
            return Err(FrameError::TypeChanged {
                name: name.to_string(),
                declared,
                found,
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_keeps_schema_fixed() {
        let mut frame = VariableFrame::new().with("y", 1.0).with("texture", "a.png");
        frame.assign("y", Value::Number(2.0)).unwrap();
        assert_eq!(frame.number("y"), Some(2.0));

        let err = frame.assign("z", Value::Number(1.0)).unwrap_err();
        assert_eq!(err.code(), "E_FRAME_UNDECLARED");
        assert!(!frame.contains("z"));

        let err = frame.assign("texture", Value::Number(1.0)).unwrap_err();
        assert_eq!(
            err,
            FrameError::TypeChanged {
                name: "texture".to_string(),
                declared: ValueType::Text,
                found: ValueType::Number,
            }
        );
        assert_eq!(frame.text("texture"), Some("a.png"));
    }

    #[test]
    fn truthiness_is_numeric_only() {
        assert_eq!(Value::Number(0.0).is_truthy(), Some(false));
        assert_eq!(Value::Number(-0.0).is_truthy(), Some(false));
        assert_eq!(Value::Number(f64::NAN).is_truthy(), Some(true));
        assert_eq!(Value::text("x").is_truthy(), None);
    }
}
