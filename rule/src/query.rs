//! QUERY iteration.

use express_core::{AggregateValue, Logical, Value};
use express_registry::Expr;
use std::slice;

use crate::error::RuleResult;
use crate::{Bindings, Evaluator};

/// Lazy filter over an aggregate's elements.
///
/// Each element is bound to the query variable and kept when the predicate
/// is TRUE; FALSE and UNKNOWN drop it. The source is only borrowed, so a new
/// `Query` over the same aggregate starts over.
pub struct Query<'e, 'a> {
    evaluator: &'e Evaluator<'a>,
    var: &'e str,
    items: slice::Iter<'e, Value>,
    predicate: &'e Expr,
    bindings: &'e Bindings,
    depth: usize,
}

impl<'e, 'a> Query<'e, 'a> {
    pub(crate) fn new(
        evaluator: &'e Evaluator<'a>,
        var: &'e str,
        source: &'e AggregateValue,
        predicate: &'e Expr,
        bindings: &'e Bindings,
        depth: usize,
    ) -> Self {
        Self {
            evaluator,
            var,
            items: source.items.iter(),
            predicate,
            bindings,
            depth,
        }
    }
}

impl Iterator for Query<'_, '_> {
    type Item = RuleResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.items.by_ref() {
            let scope = self.bindings.extend_with(self.var, item.clone());
            match self
                .evaluator
                .eval_logical_at(self.predicate, &scope, self.depth)
            {
                Ok(Logical::True) => return Some(Ok(item.clone())),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.items.size_hint().1)
    }
}
