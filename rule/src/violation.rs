//! Rule violation reports.

use express_core::{ErrorKind, InstanceId};
use std::fmt;

use crate::RuleError;

/// Which kind of declared constraint was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Entity domain rule (`WHERE`).
    Where,
    /// Entity uniqueness rule (`UNIQUE`).
    Unique,
    /// Schema-level rule (`RULE .. FOR`).
    Global,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Where => write!(f, "where"),
            RuleKind::Unique => write!(f, "unique"),
            RuleKind::Global => write!(f, "global"),
        }
    }
}

/// Why a rule is reported.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationCause {
    /// The rule evaluated to FALSE.
    False,
    /// Other instances carry the same values for the unique attributes.
    Duplicate(Vec<InstanceId>),
    /// The rule could not be evaluated.
    EvalFailed(RuleError),
}

/// A rule that does not hold.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    /// Rule label (`wr1`, `ur1`, ...).
    pub rule: String,
    /// Entity declaring the rule, or the global rule's name.
    pub owner: String,
    pub kind: RuleKind,
    /// The offending instance; `None` for global rules.
    pub instance: Option<InstanceId>,
    pub cause: ViolationCause,
}

impl RuleViolation {
    pub fn new(
        kind: RuleKind,
        owner: impl Into<String>,
        rule: impl Into<String>,
        instance: Option<InstanceId>,
        cause: ViolationCause,
    ) -> Self {
        Self {
            rule: rule.into(),
            owner: owner.into(),
            kind,
            instance,
            cause,
        }
    }

    /// Qualified rule label, `OWNER.rule`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner, self.rule)
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RuleViolation
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rule {} violated", self.kind, self.label())?;
        if let Some(id) = self.instance {
            write!(f, " by {}", id)?;
        }
        match &self.cause {
            ViolationCause::False => Ok(()),
            ViolationCause::Duplicate(others) => {
                let others: Vec<String> = others.iter().map(|id| id.to_string()).collect();
                write!(f, " (same values as {})", others.join(", "))
            }
            ViolationCause::EvalFailed(e) => write!(f, " (evaluation failed: {})", e),
        }
    }
}
