//! Parameter specifications and request binding.
//!
//! A [`ParamSpec`] is a shared, immutable template; binding a request never
//! mutates it and produces a fresh [`Binding`] instead.

use crate::domain::entity::ColumnType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the pagination parameter, accepted by every method.
pub const OFFSET: &str = "offset";

/// Client errors raised while binding query parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("O parâmetro especificado '{0}' é desconhecido.")]
    UnknownParameter(String),
    #[error("O valor passado ao parâmetro '{parameter}' não é do tipo '{expected}': '{value}'")]
    WrongType {
        parameter: String,
        expected: String,
        value: String,
    },
    #[error("Valor inválido passado ao parâmetro '{parameter}': {value}")]
    InvalidValue { parameter: String, value: String },
    #[error("O valor passado como parâmetro '{parameter}' é menor que o mínimo aceitável ({min}): {value}.")]
    BelowMinimum {
        parameter: String,
        min: String,
        value: String,
    },
    #[error("O valor passado como parâmetro '{parameter}' é maior que o máximo aceitável ({max}): {value}.")]
    AboveMaximum {
        parameter: String,
        max: String,
        value: String,
    },
    #[error("Faltou especificar o parametro '{0}', que é obrigatório.")]
    MissingRequired(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Decimal,
    Text,
    Date,
    Boolean,
}

impl ParamType {
    /// Name shown to clients in errors and documentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Integer => "int",
            ParamType::Decimal => "decimal",
            ParamType::Text => "str",
            ParamType::Date => "date",
            ParamType::Boolean => "bool",
        }
    }

    /// Whether a filter of this type can be compared with a stored column.
    pub fn compatible_with(&self, column: ColumnType) -> bool {
        matches!(
            (self, column),
            (ParamType::Integer, ColumnType::Integer)
                | (ParamType::Integer, ColumnType::Decimal)
                | (ParamType::Decimal, ColumnType::Decimal)
                | (ParamType::Text, ColumnType::Text)
                | (ParamType::Date, ColumnType::Date)
                | (ParamType::Boolean, ColumnType::Boolean)
        )
    }

    pub fn parse(&self, raw: &str) -> Option<ParamValue> {
        let trimmed = raw.trim();
        match self {
            ParamType::Integer => trimmed.parse().ok().map(ParamValue::Integer),
            ParamType::Decimal => Decimal::from_str(trimmed).ok().map(ParamValue::Decimal),
            ParamType::Text => Some(ParamValue::Text(raw.to_string())),
            ParamType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(ParamValue::Date),
            ParamType::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "t" | "1" | "sim" => Some(ParamValue::Boolean(true)),
                "false" | "f" | "0" | "nao" | "não" => Some(ParamValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, validated parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Boolean(bool),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Integer(i) => Some(Decimal::from(*i)),
            ParamValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ParamValue::Text(a), ParamValue::Text(b)) => a.partial_cmp(b),
            (ParamValue::Date(a), ParamValue::Date(b)) => a.partial_cmp(b),
            (ParamValue::Boolean(a), ParamValue::Boolean(b)) => a.partial_cmp(b),
            (a, b) => a.as_decimal()?.partial_cmp(&b.as_decimal()?),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Decimal(d) => write!(f, "{}", d),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ParamValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    /// Case-insensitive substring match.
    Contains,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparison {
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::Contains => "ILIKE",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
        }
    }
}

pub type PreTransformFn = fn(&str) -> String;
pub type ValidatorFn = fn(&ParamValue) -> bool;
pub type TransformFn = fn(ParamValue) -> ParamValue;

#[derive(Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub value_type: ParamType,
    /// Dotted path from the method's entity: relationships, then a column.
    pub query_path: String,
    pub comparison: Comparison,
    pub required: bool,
    pub default: Option<String>,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    pub pre_transform: Option<PreTransformFn>,
    pub validator: Option<ValidatorFn>,
    pub transform: Option<TransformFn>,
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("query_path", &self.query_path)
            .field("comparison", &self.comparison)
            .field("required", &self.required)
            .finish()
    }
}

impl ParamSpec {
    /// Equality filter on the column of the same name.
    pub fn new(name: &str, value_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            value_type,
            query_path: name.to_string(),
            comparison: Comparison::Equal,
            required: false,
            default: None,
            min: None,
            max: None,
            pre_transform: None,
            validator: None,
            transform: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn path(mut self, query_path: &str) -> Self {
        self.query_path = query_path.to_string();
        self
    }

    pub fn compare(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn contains(self) -> Self {
        self.compare(Comparison::Contains)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, raw: &str) -> Self {
        self.default = Some(raw.to_string());
        self
    }

    pub fn min(mut self, min: ParamValue) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: ParamValue) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pre_transform(mut self, f: PreTransformFn) -> Self {
        self.pre_transform = Some(f);
        self
    }

    pub fn validator(mut self, f: ValidatorFn) -> Self {
        self.validator = Some(f);
        self
    }

    pub fn transform(mut self, f: TransformFn) -> Self {
        self.transform = Some(f);
        self
    }

    /// pre-transform, type coercion, validator, range, transform.
    pub fn bind(&self, raw: &str) -> Result<ParamValue, QueryError> {
        let prepared = match self.pre_transform {
            Some(f) => f(raw),
            None => raw.to_string(),
        };
        let value = self
            .value_type
            .parse(&prepared)
            .ok_or_else(|| QueryError::WrongType {
                parameter: self.name.clone(),
                expected: self.value_type.to_string(),
                value: prepared.clone(),
            })?;
        if let Some(valid) = self.validator {
            if !valid(&value) {
                return Err(QueryError::InvalidValue {
                    parameter: self.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        if let Some(min) = &self.min {
            if value < *min {
                return Err(QueryError::BelowMinimum {
                    parameter: self.name.clone(),
                    min: min.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if let Some(max) = &self.max {
            if value > *max {
                return Err(QueryError::AboveMaximum {
                    parameter: self.name.clone(),
                    max: max.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(match self.transform {
            Some(f) => f(value),
            None => value,
        })
    }
}

/// One parameter with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: ParamValue,
}

/// Result of binding one request against a method's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    /// Bound filters, in the method's declaration order.
    pub filters: Vec<BoundParam>,
    pub offset: u64,
}

impl Binding {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.filters.iter().find(|b| b.name == name).map(|b| &b.value)
    }
}

/// Unparseable or negative offsets read as 0.
pub fn parse_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|o| o.max(0) as u64)
        .unwrap_or(0)
}

/// Last value of `name` in the query pairs.
fn lookup<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub fn bind(specs: &[ParamSpec], query: &[(String, String)]) -> Result<Binding, QueryError> {
    for (key, _) in query {
        if key != OFFSET && !specs.iter().any(|s| &s.name == key) {
            return Err(QueryError::UnknownParameter(key.clone()));
        }
    }

    let mut filters = Vec::new();
    for spec in specs {
        let raw = lookup(query, &spec.name).or(spec.default.as_deref());
        match raw {
            Some(raw) => filters.push(BoundParam {
                name: spec.name.clone(),
                value: spec.bind(raw)?,
            }),
            None if spec.required => return Err(QueryError::MissingRequired(spec.name.clone())),
            None => {}
        }
    }
    Ok(Binding {
        filters,
        offset: parse_offset(lookup(query, OFFSET)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn uf() -> ParamSpec {
        ParamSpec::new("uf", ParamType::Text)
            .pre_transform(|v| v.trim().to_lowercase())
            .validator(|v| matches!(v.as_text(), Some("sp" | "rj")))
            .transform(|v| match v {
                ParamValue::Text(s) => ParamValue::Text(s.to_uppercase()),
                other => other,
            })
    }

    #[test]
    fn pipeline_folds_validates_and_transforms() {
        let b = bind(&[uf()], &q(&[("uf", " Sp ")])).unwrap();
        assert_eq!(b.get("uf"), Some(&ParamValue::Text("SP".into())));
        assert_eq!(b.offset, 0);

        let err = bind(&[uf()], &q(&[("uf", "xx")])).unwrap_err();
        assert_eq!(err.to_string(), "Valor inválido passado ao parâmetro 'uf': xx");
    }

    #[test]
    fn unknown_parameter_rejected_but_offset_accepted() {
        let err = bind(&[uf()], &q(&[("estado", "sp")])).unwrap_err();
        assert_eq!(err, QueryError::UnknownParameter("estado".into()));
        let b = bind(&[uf()], &q(&[("offset", "500")])).unwrap();
        assert_eq!(b.offset, 500);
        assert!(b.filters.is_empty());
    }

    #[test]
    fn bad_offset_resets_to_zero() {
        assert_eq!(parse_offset(Some("abc")), 0);
        assert_eq!(parse_offset(Some("-20")), 0);
        assert_eq!(parse_offset(None), 0);
        assert_eq!(parse_offset(Some("1000")), 1000);
    }

    #[test]
    fn type_coercion_failure_names_type() {
        let spec = ParamSpec::new("id_municipio", ParamType::Integer);
        let err = bind(&[spec], &q(&[("id_municipio", "abc")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "O valor passado ao parâmetro 'id_municipio' não é do tipo 'int': 'abc'"
        );
    }

    #[test]
    fn min_and_max_are_checked_independently() {
        let only_max = ParamSpec::new("valor", ParamType::Decimal).max(ParamValue::Decimal(Decimal::from(10)));
        assert!(matches!(
            bind(&[only_max], &q(&[("valor", "11")])),
            Err(QueryError::AboveMaximum { .. })
        ));
        let only_min = ParamSpec::new("valor", ParamType::Decimal).min(ParamValue::Integer(0));
        assert!(matches!(
            bind(&[only_min.clone()], &q(&[("valor", "-1")])),
            Err(QueryError::BelowMinimum { .. })
        ));
        assert!(bind(&[only_min], &q(&[("valor", "0")])).is_ok());
    }

    #[test]
    fn required_and_default() {
        let spec = ParamSpec::new("id_programa", ParamType::Integer).required();
        assert_eq!(
            bind(&[spec], &[]).unwrap_err().to_string(),
            "Faltou especificar o parametro 'id_programa', que é obrigatório."
        );
        let spec = ParamSpec::new("ano", ParamType::Integer).default_value("2012");
        assert_eq!(bind(&[spec], &[]).unwrap().get("ano"), Some(&ParamValue::Integer(2012)));
    }

    #[test]
    fn last_repeated_value_wins() {
        let b = bind(&[uf()], &q(&[("uf", "sp"), ("uf", "rj")])).unwrap();
        assert_eq!(b.get("uf"), Some(&ParamValue::Text("RJ".into())));
    }
}
