//! Expression satisfaction and deficit explanation
//!
//! Both functions are total: they never fail and never panic, so they are
//! safe to call inline on every request.

use super::types::Expression;
use crate::scope::ScopeSet;

/// Checks whether `granted` satisfies `expr`
///
/// # Examples
///
/// ```
/// use taskauth_authz::expression::{satisfies, Expression};
/// use taskauth_authz::scope::ScopeSet;
///
/// let granted = ScopeSet::from_scopes(["queue:*"]);
/// let expr = Expression::all_of([Expression::literal("queue:create-task")]);
///
/// assert!(satisfies(&granted, &expr));
/// assert!(!satisfies(&ScopeSet::new(), &expr));
/// ```
pub fn satisfies(granted: &ScopeSet, expr: &Expression) -> bool {
    match expr {
        Expression::Literal(scope) => granted.covers(scope),
        Expression::AnyOf(children) => children.iter().any(|c| satisfies(granted, c)),
        Expression::AllOf(children) => children.iter().all(|c| satisfies(granted, c)),
    }
}

/// Explains what `granted` is missing to satisfy `expr`
///
/// Returns `None` when `expr` is satisfied. Otherwise returns the smallest
/// equivalent expression over the unmet requirements: satisfied `AllOf`
/// children are dropped and single-child groups collapse into their child.
///
/// # Examples
///
/// ```
/// use taskauth_authz::expression::{explain_deficit, Expression};
/// use taskauth_authz::scope::ScopeSet;
///
/// let granted = ScopeSet::from_scopes(["a"]);
/// let expr = Expression::all_of([Expression::literal("a"), Expression::literal("b")]);
///
/// assert_eq!(explain_deficit(&granted, &expr), Some(Expression::literal("b")));
/// ```
pub fn explain_deficit(granted: &ScopeSet, expr: &Expression) -> Option<Expression> {
    if satisfies(granted, expr) {
        return None;
    }
    Some(residual(granted, expr))
}

/// Residual of an expression already known to be unsatisfied
fn residual(granted: &ScopeSet, expr: &Expression) -> Expression {
    match expr {
        Expression::Literal(_) => expr.clone(),
        Expression::AllOf(children) => {
            let missing: Vec<Expression> = children
                .iter()
                .filter(|c| !satisfies(granted, c))
                .map(|c| residual(granted, c))
                .collect();
            collapse(missing, Expression::AllOf)
        }
        // every child of an unsatisfied AnyOf is unsatisfied
        Expression::AnyOf(children) if children.is_empty() => expr.clone(),
        Expression::AnyOf(children) => {
            let missing: Vec<Expression> =
                children.iter().map(|c| residual(granted, c)).collect();
            collapse(missing, Expression::AnyOf)
        }
    }
}

fn collapse(mut children: Vec<Expression>, wrap: fn(Vec<Expression>) -> Expression) -> Expression {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}
