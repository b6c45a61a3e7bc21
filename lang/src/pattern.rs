use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use danmaku_core::{FaultRecord, FaultStage, Value, VariableFrame};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::builtins::is_reserved_name;
use crate::parse;
use crate::parser::SyntaxError;
use crate::program::{Assignment, UpdateProgram, ValidationError};

/// On-disk shape of one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternDef {
    pub name: String,
    #[serde(default)]
    pub damage: i64,
    pub frame: BTreeMap<String, LiteralDef>,
    #[serde(default)]
    pub on_spawn: Vec<(String, String)>,
    #[serde(default)]
    pub update: Vec<(String, String)>,
    pub delete: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralDef {
    Number(f64),
    Text(String),
}

impl LiteralDef {
    pub fn to_value(&self) -> Value {
        match self {
            LiteralDef::Number(n) => Value::Number(*n),
            LiteralDef::Text(s) => Value::text(s),
        }
    }
}

/// Patterns read from one file. A bad definition is rejected on its own and
/// its siblings still load.
#[derive(Debug, Default)]
pub struct PatternBatch {
    pub loaded: Vec<Pattern>,
    pub rejected: Vec<PatternError>,
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
}

pub fn is_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

/// A compiled, validated spawn template.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    damage: i64,
    frame: VariableFrame,
    program: Arc<UpdateProgram>,
}

impl Pattern {
    /// Builds a pattern from parts and validates the program against the frame.
    pub fn new(name: &str, damage: i64, frame: VariableFrame, program: UpdateProgram) -> Result<Self, PatternError> {
        let label = Some(name.to_string());
        if !is_identifier(name) {
            return Err(PatternError::new(
                label,
                "name",
                PatternErrorKind::Validation(ValidationError::InvalidName {
                    name: name.to_string(),
                }),
            ));
        }
        program
            .validate(&frame)
            .map_err(|err| PatternError::new(label, "program", PatternErrorKind::Validation(err)))?;
        Ok(Self {
            name: name.to_string(),
            damage,
            frame,
            program: Arc::new(program),
        })
    }

    pub fn compile(def: &PatternDef) -> Result<Self, PatternError> {
        let label = Some(def.name.clone());
        let mut frame = VariableFrame::new();
        for (name, literal) in &def.frame {
            if !is_identifier(name) || is_reserved_name(name) {
                let err = if is_identifier(name) {
                    ValidationError::ReservedName { name: name.clone() }
                } else {
                    ValidationError::InvalidName { name: name.clone() }
                };
                return Err(PatternError::new(
                    label,
                    &format!("frame.{}", name),
                    PatternErrorKind::Validation(err),
                ));
            }
            frame.declare(name, literal.to_value());
        }

        let on_spawn = compile_assignments(&def.name, "on_spawn", &def.on_spawn)?;
        let assignments = compile_assignments(&def.name, "update", &def.update)?;
        let delete = parse(&def.delete)
            .map_err(|err| PatternError::new(label.clone(), "delete", PatternErrorKind::Syntax(err)))?;

        let program = UpdateProgram::new(assignments, delete).with_on_spawn(on_spawn);
        Self::new(&def.name, def.damage, frame, program)
    }

    /// Accepts one pattern object or an array of them. Only a file that is
    /// not JSON at all fails as a whole.
    pub fn load_json_str(text: &str) -> Result<PatternBatch, PatternError> {
        let doc: JsonValue = serde_json::from_str(text)
            .map_err(|err| PatternError::new(None, "json", PatternErrorKind::Json(err.to_string())))?;
        let items = match doc {
            JsonValue::Array(items) => items,
            other => vec![other],
        };
        let mut batch = PatternBatch::default();
        for (idx, item) in items.into_iter().enumerate() {
            let label = item
                .get("name")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", idx));
            let compiled = serde_json::from_value::<PatternDef>(item)
                .map_err(|err| PatternError::new(Some(label), "json", PatternErrorKind::Json(err.to_string())))
                .and_then(|def| Self::compile(&def));
            match compiled {
                Ok(pattern) => batch.loaded.push(pattern),
                Err(err) => batch.rejected.push(err),
            }
        }
        Ok(batch)
    }

    /// Like `load_json_str`, but the first rejected definition fails the file.
    pub fn from_json_str(text: &str) -> Result<Vec<Self>, PatternError> {
        let batch = Self::load_json_str(text)?;
        match batch.rejected.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(batch.loaded),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn damage(&self) -> i64 {
        self.damage
    }

    pub fn frame(&self) -> &VariableFrame {
        &self.frame
    }

    pub fn program(&self) -> &Arc<UpdateProgram> {
        &self.program
    }

    /// The initial frame with `overrides` written in. Overrides may only
    /// replace declared variables with values of the same type.
    pub fn instantiate(&self, overrides: &[(&str, Value)]) -> Result<VariableFrame, ValidationError> {
        let mut frame = self.frame.clone();
        for (name, value) in overrides {
            let declared = frame
                .type_of(name)
                .ok_or_else(|| ValidationError::UndeclaredWrite {
                    name: name.to_string(),
                })?;
            let found = value.value_type();
            if declared != found {
                return Err(ValidationError::TypeClash {
                    name: name.to_string(),
                    declared,
                    found,
                });
            }
            frame.declare(name, value.clone());
        }
        Ok(frame)
    }
}

fn compile_assignments(
    pattern: &str,
    section: &str,
    pairs: &[(String, String)],
) -> Result<Vec<Assignment>, PatternError> {
    pairs
        .iter()
        .enumerate()
        .map(|(idx, (target, text))| {
            Assignment::parse(target, text).map_err(|err| {
                PatternError::new(
                    Some(pattern.to_string()),
                    &format!("{}[{}].{}", section, idx, target),
                    PatternErrorKind::Syntax(err),
                )
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternErrorKind {
    Json(String),
    Syntax(SyntaxError),
    Validation(ValidationError),
}

/// Load-time failure, labelled with the pattern and the offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternError {
    pub pattern: Option<String>,
    pub field: String,
    pub kind: PatternErrorKind,
}

impl PatternError {
    fn new(pattern: Option<String>, field: &str, kind: PatternErrorKind) -> Self {
        Self {
            pattern,
            field: field.to_string(),
            kind,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.kind {
            PatternErrorKind::Json(_) => "E_PATTERN_JSON",
            PatternErrorKind::Syntax(err) => err.code(),
            PatternErrorKind::Validation(err) => err.code(),
        }
    }

    /// Load faults happen before the first tick.
    pub fn fault_record(&self) -> FaultRecord {
        FaultRecord {
            tick_id: 0,
            stage: FaultStage::Load,
            pattern: self.pattern.clone().unwrap_or_else(|| "-".to_string()),
            instance: None,
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pattern = self.pattern.as_deref().unwrap_or("-");
        match &self.kind {
            PatternErrorKind::Json(detail) => {
                write!(f, "{} pattern={} field={} {}", self.code(), pattern, self.field, detail)
            }
            PatternErrorKind::Syntax(err) => write!(f, "pattern={} field={} {}", pattern, self.field, err),
            PatternErrorKind::Validation(err) => {
                write!(f, "pattern={} field={} {}", pattern, self.field, err)
            }
        }
    }
}

impl std::error::Error for PatternError {}
