//! Validation of instances against their declared rules.

use express_core::{AggregateKind, AggregateValue, InstanceId, Logical, Value};
use express_pool::InstancePool;
use express_registry::{Expr, UniqueRule};
use tracing::{debug, trace};

use crate::error::{RuleError, RuleResult};
use crate::eval::values_equal;
use crate::{Bindings, Evaluator, RuleKind, RuleViolation, ViolationCause};

/// Runs where, unique and global rules over a pool snapshot.
///
/// Violations are collected, never raised: only a FALSE result is a
/// violation, UNKNOWN satisfies a rule, and a rule that fails to evaluate is
/// reported with its error as the cause.
pub struct Validator<'a> {
    evaluator: Evaluator<'a>,
}

impl<'a> Validator<'a> {
    pub fn new(pool: &'a InstancePool) -> Self {
        Self {
            evaluator: Evaluator::new(pool),
        }
    }

    pub fn evaluator(&self) -> &Evaluator<'a> {
        &self.evaluator
    }

    /// Run every where and unique rule declared on the instance's entity and
    /// its ancestors, supertypes first.
    pub fn validate(&self, id: InstanceId) -> RuleResult<Vec<RuleViolation>> {
        let pool = self.evaluator.pool();
        let registry = self.evaluator.registry();
        let instance = pool.get(id).ok_or(RuleError::InstanceNotFound(id))?;
        let bindings = Bindings::for_instance(id);
        let mut violations = Vec::new();

        for (owner, rule) in registry.rules_for(&instance.entity) {
            if let Some(cause) = self.check(&rule.expr, &bindings) {
                violations.push(RuleViolation::new(
                    RuleKind::Where,
                    owner,
                    &rule.name,
                    Some(id),
                    cause,
                ));
            }
        }

        for (owner, rule) in registry.unique_rules_for(&instance.entity) {
            let cause = match self.unique_clashes(id, owner, rule) {
                Ok(clashes) if clashes.is_empty() => continue,
                Ok(clashes) => ViolationCause::Duplicate(clashes),
                Err(e) => ViolationCause::EvalFailed(e),
            };
            violations.push(RuleViolation::new(
                RuleKind::Unique,
                owner,
                &rule.name,
                Some(id),
                cause,
            ));
        }

        debug!(%id, entity = %instance.entity, violations = violations.len(), "instance validated");
        Ok(violations)
    }

    /// Run every global rule, binding each entity it ranges over to that
    /// entity's live extent.
    pub fn validate_global(&self) -> Vec<RuleViolation> {
        let pool = self.evaluator.pool();
        let mut violations = Vec::new();

        for rule in self.evaluator.registry().global_rules() {
            let mut bindings = Bindings::new();
            for entity in &rule.entities {
                let extent = pool.extent(entity).into_iter().map(Value::EntityRef).collect();
                bindings.insert(
                    entity,
                    Value::Aggregate(
                        AggregateValue::new(AggregateKind::Set, extent).with_element_type(entity.clone()),
                    ),
                );
            }
            for wr in &rule.where_rules {
                if let Some(cause) = self.check(&wr.expr, &bindings) {
                    violations.push(RuleViolation::new(
                        RuleKind::Global,
                        &rule.name,
                        &wr.name,
                        None,
                        cause,
                    ));
                }
            }
        }

        debug!(violations = violations.len(), "global rules validated");
        violations
    }

    /// Validate every live instance, then the global rules.
    pub fn validate_all(&self) -> RuleResult<Vec<RuleViolation>> {
        let mut violations = Vec::new();
        for instance in self.evaluator.pool().iter() {
            violations.extend(self.validate(instance.id)?);
        }
        violations.extend(self.validate_global());
        Ok(violations)
    }

    fn check(&self, expr: &Expr, bindings: &Bindings) -> Option<ViolationCause> {
        match self.evaluator.eval_logical(expr, bindings) {
            Ok(Logical::False) => Some(ViolationCause::False),
            Ok(result) => {
                trace!(%result, "rule satisfied");
                None
            }
            Err(e) => Some(ViolationCause::EvalFailed(e)),
        }
    }

    /// Other instances of the rule's owner with equal values for every
    /// attribute of the rule. Instances with an indeterminate value take
    /// no part in the comparison.
    fn unique_clashes(
        &self,
        id: InstanceId,
        owner: &str,
        rule: &UniqueRule,
    ) -> RuleResult<Vec<InstanceId>> {
        let Some(key) = self.unique_key(id, rule)? else {
            return Ok(Vec::new());
        };
        let mut clashes = Vec::new();
        for other in self.evaluator.pool().extent(owner) {
            if other == id {
                continue;
            }
            if let Some(other_key) = self.unique_key(other, rule)? {
                if key.iter().zip(&other_key).all(|(a, b)| values_equal(a, b)) {
                    clashes.push(other);
                }
            }
        }
        Ok(clashes)
    }

    fn unique_key(&self, id: InstanceId, rule: &UniqueRule) -> RuleResult<Option<Vec<Value>>> {
        let mut key = Vec::with_capacity(rule.attributes.len());
        for attr in &rule.attributes {
            let value = self.evaluator.attribute(id, attr)?;
            if value.is_undefined() {
                return Ok(None);
            }
            key.push(value);
        }
        Ok(Some(key))
    }
}
