//! Declarative schema description: field types, per-field rules and
//! cross-field refinements.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern is valid"));

// == Field Type ==
/// Primitive or composite type of one field.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    Enum(&'static [&'static str]),
    Array(Box<FieldType>),
    Object(Schema),
    /// Any JSON value, passed through untouched
    Any,
}

// == Rule ==
/// Constraint checked after a value was coerced to its field type.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Characters for strings, items for arrays
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Pattern(Regex, &'static str),
}

impl Rule {
    pub fn email() -> Self {
        Rule::Pattern(EMAIL_PATTERN.clone(), "Must be a valid email address")
    }

    pub fn phone() -> Self {
        Rule::Pattern(PHONE_PATTERN.clone(), "Must be a valid phone number")
    }
}

// == Field ==
/// One named field of a schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub rules: Vec<Rule>,
}

impl Field {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn one_of(name: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(name, FieldType::Enum(options))
    }

    pub fn array(name: &'static str, items: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(items)))
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldType::Object(schema))
    }

    pub fn any(name: &'static str) -> Self {
        Self::new(name, FieldType::Any)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value inserted when the field is missing or null.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn min_len(self, n: usize) -> Self {
        self.rule(Rule::MinLength(n))
    }

    pub fn max_len(self, n: usize) -> Self {
        self.rule(Rule::MaxLength(n))
    }

    pub fn min(self, n: f64) -> Self {
        self.rule(Rule::Min(n))
    }

    pub fn max(self, n: f64) -> Self {
        self.rule(Rule::Max(n))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::email())
    }

    pub fn phone(self) -> Self {
        self.rule(Rule::phone())
    }
}

// == Refinement ==
/// Cross-field predicate evaluated on the coerced object.
///
/// When `check` returns false, `message` is recorded under `path`.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub path: &'static str,
    pub message: &'static str,
    pub check: fn(&Map<String, Value>) -> bool,
}

// == Schema ==
/// Immutable description of an operation's parameters.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
    pub refinements: Vec<Refinement>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            refinements: Vec::new(),
        }
    }

    pub fn refine(
        mut self,
        path: &'static str,
        message: &'static str,
        check: fn(&Map<String, Value>) -> bool,
    ) -> Self {
        self.refinements.push(Refinement {
            path,
            message,
            check,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
