//! Restricted expression evaluation for step conditions and overwrite maps.
//!
//! Expressions are CEL (Common Expression Language): boolean, arithmetic and
//! comparison operators, attribute access on the provided variables, and
//! literal maps/lists. No assignment, no I/O, no imports — the interpreter
//! guarantees the sandbox. Expressions are compiled at definition-save time
//! and evaluated against a closed variable set at run time.
//!
//! Available variables: `partner`, `amount`, `currency`, `date`, `company`,
//! `reference`, `source_name`, `previous_documents`.

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::objects::Key;
use cel_interpreter::{Context, Program, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ExecutionContext, GeneratedDocument, LineOverride, OverrideMap, WorkflowDefinition,
};

/// Evaluates condition and overwrite expressions against an execution
/// context. Stateless: the CEL context is rebuilt from the
/// `ExecutionContext` on every call, so equal contexts always yield equal
/// results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Save-time syntax check. Rejects strings that fail to parse as CEL.
    pub fn check_syntax(expression: &str) -> Result<(), String> {
        Program::compile(expression)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// All save-time issues for a definition: structural data quality plus
    /// condition/overwrite syntax. Empty means the definition is acceptable.
    pub fn validate_definition(definition: &WorkflowDefinition) -> Vec<String> {
        let mut issues = definition.data_issues();
        for step in &definition.steps {
            // Empty expressions mean "absent" and never reach the parser.
            if let Some(condition) = step.effective_condition() {
                if let Err(err) = Self::check_syntax(condition) {
                    issues.push(format!(
                        "Invalid syntax in condition `{condition}` (template {}): {err}",
                        step.template.name
                    ));
                }
            }
            if let Some(overwrite) = step.effective_overwrite() {
                if let Err(err) = Self::check_syntax(overwrite) {
                    issues.push(format!(
                        "Invalid syntax in overwrite `{overwrite}` (template {}): {err}",
                        step.template.name
                    ));
                }
            }
        }
        issues
    }

    /// Evaluate a condition expression, coercing the result to a boolean
    /// with loose truthiness (empty strings/lists/maps and zero are false).
    pub fn evaluate_condition(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> DomainResult<bool> {
        let value = self.evaluate(expression, ctx)?;
        Ok(Self::truthy(&value))
    }

    /// Evaluate an overwrite expression, which must yield a map from
    /// step-line label to a field-override map.
    pub fn evaluate_overwrite(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> DomainResult<OverrideMap> {
        let value = self.evaluate(expression, ctx)?;
        Self::as_override_map(expression, &value)
    }

    fn evaluate(&self, expression: &str, ctx: &ExecutionContext) -> DomainResult<Value> {
        let program = Program::compile(expression).map_err(|e| DomainError::Expression {
            expression: expression.to_string(),
            cause: e.to_string(),
        })?;
        let context = Self::build_context(ctx).map_err(|cause| DomainError::Expression {
            expression: expression.to_string(),
            cause,
        })?;
        program.execute(&context).map_err(|e| DomainError::Expression {
            expression: expression.to_string(),
            cause: e.to_string(),
        })
    }

    fn build_context(ctx: &ExecutionContext) -> Result<Context<'static>, String> {
        let mut context = Context::default();

        let partner = match &ctx.partner {
            Some(partner) => Self::map_value(vec![
                ("id", Self::string_value(&partner.id.to_string())),
                ("name", Self::string_value(&partner.name)),
            ]),
            None => Value::Null,
        };
        let previous: Vec<Value> = ctx
            .previous_documents
            .iter()
            .map(Self::document_value)
            .collect();

        let vars: Vec<(&str, Value)> = vec![
            ("partner", partner),
            ("amount", Value::Float(ctx.amount)),
            ("currency", Self::string_value(&ctx.currency)),
            ("date", Self::string_value(&ctx.date.to_string())),
            ("company", Self::string_value(&ctx.company)),
            ("reference", Self::optional_string(ctx.reference.as_deref())),
            (
                "source_name",
                Self::optional_string(ctx.source_name.as_deref()),
            ),
            ("previous_documents", Value::List(Arc::new(previous))),
        ];
        for (name, value) in vars {
            context
                .add_variable(name, value)
                .map_err(|e| format!("Failed to add variable `{name}`: {e}"))?;
        }
        Ok(context)
    }

    /// Project a generated document into the variable set so later steps'
    /// expressions can inspect earlier outputs.
    fn document_value(doc: &GeneratedDocument) -> Value {
        Self::map_value(vec![
            ("id", Self::string_value(&doc.id.to_string())),
            ("name", Self::string_value(&doc.name)),
            ("template", Self::string_value(&doc.template_name)),
            ("amount", Value::Float(doc.amount)),
            ("date", Self::string_value(&doc.date.to_string())),
            ("reference", Self::string_value(&doc.reference)),
            (
                "position",
                doc.workflow_position
                    .map_or(Value::Null, |p| Value::Int(i64::from(p))),
            ),
        ])
    }

    fn string_value(s: &str) -> Value {
        Value::String(Arc::new(s.to_string()))
    }

    fn optional_string(s: Option<&str>) -> Value {
        s.map_or(Value::Null, Self::string_value)
    }

    fn map_value(entries: Vec<(&str, Value)>) -> Value {
        let map: HashMap<Key, Value> = entries
            .into_iter()
            .map(|(k, v)| (Key::String(Arc::new(k.to_string())), v))
            .collect();
        Value::Map(map.into())
    }

    /// Loose truthiness: numbers are true when nonzero, strings and
    /// collections when nonempty, null never.
    fn truthy(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.map.is_empty(),
            Value::Null => false,
            _ => true,
        }
    }

    fn key_to_string(key: &Key) -> String {
        match key {
            Key::Int(i) => i.to_string(),
            Key::Uint(u) => u.to_string(),
            Key::Bool(b) => b.to_string(),
            Key::String(s) => s.to_string(),
        }
    }

    fn value_to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Int(i) => serde_json::json!(i),
            Value::UInt(u) => serde_json::json!(u),
            Value::Float(f) => serde_json::json!(f),
            Value::Bool(b) => serde_json::json!(b),
            Value::String(s) => serde_json::json!(s.as_ref()),
            Value::Bytes(b) => serde_json::json!(String::from_utf8_lossy(b)),
            Value::List(list) => {
                serde_json::Value::Array(list.iter().map(Self::value_to_json).collect())
            }
            Value::Map(map) => {
                let json_map: serde_json::Map<String, serde_json::Value> = map
                    .map
                    .iter()
                    .map(|(k, v)| (Self::key_to_string(k), Self::value_to_json(v)))
                    .collect();
                serde_json::Value::Object(json_map)
            }
            Value::Timestamp(ts) => serde_json::json!(ts.to_rfc3339()),
            _ => serde_json::Value::Null,
        }
    }

    fn as_override_map(expression: &str, value: &Value) -> DomainResult<OverrideMap> {
        let Value::Map(map) = value else {
            return Err(DomainError::Expression {
                expression: expression.to_string(),
                cause: "overwrite must evaluate to a map of line labels to value maps".to_string(),
            });
        };

        let mut overrides = OverrideMap::default();
        for (key, entry) in map.map.iter() {
            let label = Self::key_to_string(key);
            let Value::Map(fields) = entry else {
                return Err(DomainError::Expression {
                    expression: expression.to_string(),
                    cause: format!("overwrite for line `{label}` must be a map of field values"),
                });
            };
            let line: LineOverride = fields
                .map
                .iter()
                .map(|(k, v)| (Self::key_to_string(k), Self::value_to_json(v)))
                .collect();
            overrides.0.insert(label, line);
        }
        Ok(overrides)
    }
}
