use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Maximum nesting accepted when parsing stored conditions.
const MAX_CONDITION_DEPTH: usize = 32;

/// Flat attribute map describing the request being authorized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Creates an empty attribute context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context with one attribute set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Sets one attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns one attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns whether no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns attributes sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Attributes {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self(value)
    }
}

/// Ordering operators for numeric or textual attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

impl CompareOperator {
    /// Returns the canonical storage symbol.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering.is_lt(),
            Self::Lte => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Gte => ordering.is_ge(),
        }
    }
}

/// Attribute-based predicate attached to a grant edge.
///
/// Stored conditions are parsed with [`Condition::from_json`], which never
/// fails: shapes it does not understand become [`Condition::Unsatisfiable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute equals a literal.
    Equals {
        /// Attribute name.
        attribute: String,
        /// Expected value.
        value: Value,
    },
    /// Attribute equals one of the listed literals.
    In {
        /// Attribute name.
        attribute: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Attribute compares against a number or string literal.
    Compare {
        /// Attribute name.
        attribute: String,
        /// Ordering operator.
        operator: CompareOperator,
        /// Right-hand literal.
        value: Value,
    },
    /// Every child holds.
    And(Vec<Condition>),
    /// At least one child holds.
    Or(Vec<Condition>),
    /// The child does not hold.
    Not(Box<Condition>),
    /// Malformed stored predicate. Never satisfied.
    Unsatisfiable {
        /// Why parsing rejected the stored shape.
        reason: String,
    },
}

/// Three-valued result of evaluating a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The predicate holds for the context.
    Satisfied,
    /// The predicate definitively does not hold.
    Unsatisfied,
    /// A referenced attribute is missing, has an incomparable type, or the
    /// predicate is malformed.
    Indeterminate,
}

impl ConditionOutcome {
    /// Evaluates optional conditions; absent conditions are always satisfied.
    #[must_use]
    pub fn of(conditions: Option<&Condition>, attributes: &Attributes) -> Self {
        conditions.map_or(Self::Satisfied, |condition| condition.outcome(attributes))
    }

    /// Returns whether an edge guarded by this outcome takes part in a
    /// decision. Missing attributes and malformed predicates never satisfy.
    #[must_use]
    pub fn is_satisfied(self) -> bool {
        self == Self::Satisfied
    }
}

impl Condition {
    /// Creates an equality predicate.
    #[must_use]
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Creates a set-membership predicate.
    #[must_use]
    pub fn one_of(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            attribute: attribute.into(),
            values,
        }
    }

    /// Creates an ordering predicate.
    #[must_use]
    pub fn compare(
        attribute: impl Into<String>,
        operator: CompareOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Compare {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parses stored JSON conditions.
    ///
    /// Returns `None` for absent conditions (`null`, `{}` or `[]`), which
    /// grant unconditionally. A top-level array is an implicit `and`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(object) if object.is_empty() => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(Self::And(
                items.iter().map(|item| Self::parse_node(item, 1)).collect(),
            )),
            other => Some(Self::parse_node(other, 0)),
        }
    }

    fn parse_node(value: &Value, depth: usize) -> Self {
        if depth > MAX_CONDITION_DEPTH {
            return Self::unsatisfiable("condition nesting is too deep");
        }

        let Some(object) = value.as_object() else {
            return Self::unsatisfiable("condition node must be an object");
        };

        for (keyword, combinator) in [("and", "and"), ("all", "and"), ("or", "or"), ("any", "or")] {
            if let Some(children) = object.get(keyword) {
                return Self::parse_combinator(object, keyword, combinator, children, depth);
            }
        }

        if let Some(inner) = object.get("not") {
            if object.len() != 1 {
                return Self::unsatisfiable("'not' node must not carry other keys");
            }
            return Self::Not(Box::new(Self::parse_node(inner, depth + 1)));
        }

        Self::parse_predicate(object)
    }

    fn parse_combinator(
        object: &Map<String, Value>,
        keyword: &str,
        combinator: &str,
        children: &Value,
        depth: usize,
    ) -> Self {
        if object.len() != 1 {
            return Self::unsatisfiable(format!("'{keyword}' node must not carry other keys"));
        }

        let Some(items) = children.as_array() else {
            return Self::unsatisfiable(format!("'{keyword}' expects an array"));
        };

        if items.is_empty() {
            return Self::unsatisfiable(format!("'{keyword}' expects at least one child"));
        }

        let children = items
            .iter()
            .map(|item| Self::parse_node(item, depth + 1))
            .collect();

        if combinator == "and" {
            Self::And(children)
        } else {
            Self::Or(children)
        }
    }

    fn parse_predicate(object: &Map<String, Value>) -> Self {
        let Some(attribute) = object
            .get("attribute")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
        else {
            return Self::unsatisfiable("predicate requires a non-empty 'attribute'");
        };

        let Some(operator) = object.get("op").and_then(Value::as_str) else {
            return Self::unsatisfiable("predicate requires an 'op'");
        };

        let Some(value) = object.get("value") else {
            return Self::unsatisfiable("predicate requires a 'value'");
        };

        match operator {
            "eq" | "=" | "==" => Self::equals(attribute, value.clone()),
            "ne" | "!=" => Self::Not(Box::new(Self::equals(attribute, value.clone()))),
            "in" | "not_in" => {
                let Some(values) = value.as_array() else {
                    return Self::unsatisfiable(format!("'{operator}' expects an array value"));
                };
                let membership = Self::one_of(attribute, values.clone());
                if operator == "in" {
                    membership
                } else {
                    Self::Not(Box::new(membership))
                }
            }
            "lt" | "<" => Self::compare(attribute, CompareOperator::Lt, value.clone()),
            "lte" | "<=" => Self::compare(attribute, CompareOperator::Lte, value.clone()),
            "gt" | ">" => Self::compare(attribute, CompareOperator::Gt, value.clone()),
            "gte" | ">=" => Self::compare(attribute, CompareOperator::Gte, value.clone()),
            other => Self::unsatisfiable(format!("unknown operator '{other}'")),
        }
    }

    fn unsatisfiable(reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            reason: reason.into(),
        }
    }

    /// Serializes the condition to its canonical stored JSON form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Equals { attribute, value } => {
                json!({ "attribute": attribute, "op": "eq", "value": value })
            }
            Self::In { attribute, values } => {
                json!({ "attribute": attribute, "op": "in", "value": values })
            }
            Self::Compare {
                attribute,
                operator,
                value,
            } => json!({ "attribute": attribute, "op": operator.as_str(), "value": value }),
            Self::And(children) => {
                json!({ "and": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            Self::Or(children) => {
                json!({ "or": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            Self::Not(inner) => json!({ "not": inner.to_json() }),
            // Kept invalid on purpose so a round trip stays unsatisfiable.
            Self::Unsatisfiable { reason } => json!({ "unsatisfiable": reason }),
        }
    }

    /// Returns whether any node of the tree came from a malformed shape.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Unsatisfiable { .. } => true,
            Self::And(children) | Self::Or(children) => children.iter().any(Self::is_malformed),
            Self::Not(inner) => inner.is_malformed(),
            Self::Equals { .. } | Self::In { .. } | Self::Compare { .. } => false,
        }
    }

    /// Returns whether the condition holds for the attribute context.
    #[must_use]
    pub fn evaluate(&self, attributes: &Attributes) -> bool {
        self.outcome(attributes) == ConditionOutcome::Satisfied
    }

    /// Evaluates the condition into a three-valued outcome.
    ///
    /// Any indeterminate node makes the whole tree indeterminate, including
    /// under `not` and `or`, so a missing attribute can never flip a
    /// predicate into granting access.
    #[must_use]
    pub fn outcome(&self, attributes: &Attributes) -> ConditionOutcome {
        match self.resolve(attributes) {
            Some(true) => ConditionOutcome::Satisfied,
            Some(false) => ConditionOutcome::Unsatisfied,
            None => ConditionOutcome::Indeterminate,
        }
    }

    fn resolve(&self, attributes: &Attributes) -> Option<bool> {
        match self {
            Self::Equals { attribute, value } => attributes
                .get(attribute)
                .map(|actual| values_equal(actual, value)),
            Self::In { attribute, values } => attributes
                .get(attribute)
                .map(|actual| values.iter().any(|candidate| values_equal(actual, candidate))),
            Self::Compare {
                attribute,
                operator,
                value,
            } => {
                let actual = attributes.get(attribute)?;
                compare_values(actual, value).map(|ordering| operator.accepts(ordering))
            }
            Self::And(children) => children
                .iter()
                .map(|child| child.resolve(attributes))
                .collect::<Option<Vec<_>>>()
                .map(|results| results.into_iter().all(|result| result)),
            Self::Or(children) => children
                .iter()
                .map(|child| child.resolve(attributes))
                .collect::<Option<Vec<_>>>()
                .map(|results| results.into_iter().any(|result| result)),
            Self::Not(inner) => inner.resolve(attributes).map(|result| !result),
            Self::Unsatisfiable { .. } => None,
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left_number), Some(right_number)) => left_number == right_number,
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(left_number), Some(right_number)) = (left.as_f64(), right.as_f64()) {
        return left_number.partial_cmp(&right_number);
    }

    if let (Some(left_text), Some(right_text)) = (left.as_str(), right.as_str()) {
        return Some(left_text.cmp(right_text));
    }

    None
}
