//! Value types crossing the template-expansion boundary.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::Partner;

/// What the adapter knows about a template, as an explicit optional-field
/// record. Replaces runtime attribute probing on the collaborator's side:
/// a capability the template lacks is simply `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub id: Uuid,
    pub name: String,
    /// Default partner the template carries, used when the request has none.
    pub default_partner: Option<Partner>,
    /// Template-defined accounting date that overrides the request's.
    pub fixed_date: Option<NaiveDate>,
    /// Default journal the template posts into.
    pub journal: Option<String>,
}

/// Parameters for one `instantiate` call: the resolved step.
#[derive(Debug, Clone)]
pub struct ExpansionParams {
    pub template_id: Uuid,
    pub date: NaiveDate,
    pub company: String,
    /// Template's own journal when it defines one, else the run's.
    pub journal: Option<String>,
    pub partner: Option<Partner>,
    /// Run reference plus the step's 1-based position.
    pub reference: String,
    pub amount: f64,
    pub currency: String,
}

/// How a draft line gets its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Amount supplied by the caller.
    Input,
    /// Amount computed by the template's own formula.
    Computed,
}

/// One concrete line item derived from the template's line-generation logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftLine {
    /// Step-line label, the key overwrite maps address (e.g. `L1`).
    pub label: String,
    pub kind: LineKind,
    pub account: String,
    pub amount: f64,
    pub description: Option<String>,
}

/// Result of `load_lines`: concrete lines plus the adapter's own context
/// values carried through to `finalize`.
#[derive(Debug, Clone, Default)]
pub struct DraftLines {
    pub lines: Vec<DraftLine>,
    pub context: BTreeMap<String, serde_json::Value>,
}

/// Opaque handle to an in-flight expansion on the adapter's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftHandle {
    pub id: Uuid,
    pub template_id: Uuid,
}

/// Field overrides for one line: field name to value.
pub type LineOverride = BTreeMap<String, serde_json::Value>;

/// Mapping from step-line label to a value-override map, the shape an
/// overwrite expression must evaluate to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideMap(pub BTreeMap<String, LineOverride>);

impl OverrideMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set one field override on one line label.
    pub fn set(
        &mut self,
        label: impl Into<String>,
        field: impl Into<String>,
        value: serde_json::Value,
    ) {
        self.0
            .entry(label.into())
            .or_default()
            .insert(field.into(), value);
    }

    /// Merge `other` over self; on collisions `other` wins field by field.
    pub fn merge(&mut self, other: OverrideMap) {
        for (label, fields) in other.0 {
            let entry = self.0.entry(label).or_default();
            for (field, value) in fields {
                entry.insert(field, value);
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&LineOverride> {
        self.0.get(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_other_wins_per_field() {
        let mut base = OverrideMap::default();
        base.set("L1", "amount", json!(100.0));
        base.set("L1", "name", json!("base"));

        let mut over = OverrideMap::default();
        over.set("L1", "amount", json!(50.0));
        over.set("L2", "amount", json!(7.5));

        base.merge(over);
        assert_eq!(base.get("L1").unwrap()["amount"], json!(50.0));
        assert_eq!(base.get("L1").unwrap()["name"], json!("base"));
        assert_eq!(base.get("L2").unwrap()["amount"], json!(7.5));
    }
}
