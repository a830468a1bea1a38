//! Pure evaluation of compiled expression trees
//!
//! Evaluation is a function of (tree, environment) with no carried state.
//! Absent paths produce [`Val::Missing`], which compares non-equal to
//! everything and is never a member of a list; only type mismatches raise.

use serde_json::Value;

use nev_event::value::lookup;

use crate::parser::{CmpOp, Expr};
use crate::ExprError;

static TRUE: Value = Value::Bool(true);
static FALSE: Value = Value::Bool(false);

/// An intermediate evaluation result
#[derive(Debug, Clone, Copy)]
enum Val<'a> {
    /// The sentinel for an absent path
    Missing,
    V(&'a Value),
}

/// Evaluate an expression to its final boolean result
pub(crate) fn eval_bool(expr: &Expr, env: &Value) -> Result<bool, ExprError> {
    match eval(expr, env)? {
        Val::V(Value::Bool(b)) => Ok(*b),
        Val::Missing => Ok(false),
        Val::V(other) => Err(ExprError::Eval(format!(
            "expression evaluated to {} instead of a boolean",
            type_name(other)
        ))),
    }
}

fn eval<'a>(expr: &'a Expr, env: &'a Value) -> Result<Val<'a>, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(Val::V(value)),
        Expr::Path(path) => Ok(match lookup(env, path) {
            Some(value) => Val::V(value),
            None => Val::Missing,
        }),
        Expr::Has(path) => Ok(bool_val(lookup(env, path).is_some())),
        Expr::Not(inner) => {
            let b = expect_bool(eval(inner, env)?, "operand of '!'")?;
            Ok(bool_val(!b))
        }
        Expr::And(lhs, rhs) => {
            if !expect_bool(eval(lhs, env)?, "left operand of '&&'")? {
                return Ok(bool_val(false));
            }
            let b = expect_bool(eval(rhs, env)?, "right operand of '&&'")?;
            Ok(bool_val(b))
        }
        Expr::Or(lhs, rhs) => {
            if expect_bool(eval(lhs, env)?, "left operand of '||'")? {
                return Ok(bool_val(true));
            }
            let b = expect_bool(eval(rhs, env)?, "right operand of '||'")?;
            Ok(bool_val(b))
        }
        Expr::Compare(op, lhs, rhs) => {
            let l = eval(lhs, env)?;
            let r = eval(rhs, env)?;
            Ok(bool_val(compare(*op, l, r)?))
        }
        Expr::In(needle, haystack) => {
            let n = eval(needle, env)?;
            let h = eval(haystack, env)?;
            Ok(bool_val(contains(n, h)?))
        }
    }
}

fn bool_val<'a>(b: bool) -> Val<'a> {
    Val::V(if b { &TRUE } else { &FALSE })
}

fn expect_bool(val: Val<'_>, context: &str) -> Result<bool, ExprError> {
    match val {
        Val::V(Value::Bool(b)) => Ok(*b),
        Val::Missing => Ok(false),
        Val::V(other) => Err(ExprError::Eval(format!(
            "{context} is {}, expected a boolean",
            type_name(other)
        ))),
    }
}

fn compare(op: CmpOp, lhs: Val<'_>, rhs: Val<'_>) -> Result<bool, ExprError> {
    match op {
        // Missing compares non-equal to everything, including Missing
        CmpOp::Eq => Ok(match (lhs, rhs) {
            (Val::V(a), Val::V(b)) => values_equal(a, b),
            _ => false,
        }),
        CmpOp::Ne => Ok(match (lhs, rhs) {
            (Val::V(a), Val::V(b)) => !values_equal(a, b),
            _ => true,
        }),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let (a, b) = match (lhs, rhs) {
                (Val::V(a), Val::V(b)) => (a, b),
                _ => {
                    return Err(ExprError::Eval(
                        "ordering comparison against a missing value".into(),
                    ));
                }
            };
            ordered(op, a, b)
        }
    }
}

fn ordered(op: CmpOp, a: &Value, b: &Value) -> Result<bool, ExprError> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return Ok(match op {
            CmpOp::Lt => x < y,
            CmpOp::Le => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Ge => x >= y,
            CmpOp::Eq | CmpOp::Ne => unreachable!("handled by compare"),
        });
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Ok(match op {
            CmpOp::Lt => x < y,
            CmpOp::Le => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Ge => x >= y,
            CmpOp::Eq | CmpOp::Ne => unreachable!("handled by compare"),
        });
    }
    Err(ExprError::Eval(format!(
        "cannot order {} against {}",
        type_name(a),
        type_name(b)
    )))
}

fn contains(needle: Val<'_>, haystack: Val<'_>) -> Result<bool, ExprError> {
    let items = match haystack {
        Val::Missing => return Ok(false),
        Val::V(Value::Array(items)) => items,
        Val::V(other) => {
            return Err(ExprError::Eval(format!(
                "'in' requires a list, got {}",
                type_name(other)
            )));
        }
    };
    let needle = match needle {
        Val::Missing => return Ok(false),
        Val::V(value) => value,
    };
    Ok(items.iter().any(|item| values_equal(needle, item)))
}

/// Equality that treats 1 and 1.0 as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x == y;
    }
    a == b
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
