//! The expression tree: arithmetic, comparison, boolean logic, `BETWEEN`,
//! `IN`, and `LIKE`, each node evaluated tuple-at-a-time against the
//! current row's slot in [`RuntimeContext`].
//!
//! Every node owns a [`TupleHandle`] naming the slot it writes its result
//! into. `compute` always writes through that slot — there is no separate
//! "evaluate without storing" path, because every caller that only wants
//! the value reads it straight back out of the slot immediately afterwards
//! (see [`Expression::compute_and_get`]). Null propagation follows
//! three-valued SQL logic throughout: any arithmetic or comparison operand
//! that is NULL makes the result NULL, except where `AND`/`OR` short-circuit
//! (§GLOSSARY logical pruning) on a determining operand first.

pub mod like;

use crate::context::RuntimeContext;
use crate::handle::TupleHandle;
use crate::value::{DataType, RuntimeValue, VariantValue};
use like::LikePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

impl BinaryOp {
    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le
        )
    }

    fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone)]
pub struct ColumnExpr {
    /// Identifies the source table column this node reads, independent of
    /// which tuple slot it happens to be bound to — [`crate::lazy_load`]
    /// classifies columns by this id, not by slot.
    pub column_id: usize,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: RuntimeValue,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub handle: TupleHandle,
    /// Whether `And`/`Or` may skip evaluating `right` when `left` already
    /// determines the result. Set at plan time from `EngineConfig`.
    pub logical_pruning: bool,
}

#[derive(Debug, Clone)]
pub struct BetweenExpr {
    pub value: Box<Expression>,
    pub low: Box<Expression>,
    pub high: Box<Expression>,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub struct InExpr {
    pub value: Box<Expression>,
    pub list: Vec<Expression>,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub struct LikeExpr {
    pub value: Box<Expression>,
    pub pattern: LikePattern,
    pub negated: bool,
    pub handle: TupleHandle,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Column(ColumnExpr),
    Literal(LiteralExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Between(BetweenExpr),
    In(InExpr),
    Like(LikeExpr),
}

impl Expression {
    pub fn handle(&self) -> TupleHandle {
        match self {
            Expression::Column(e) => e.handle,
            Expression::Literal(e) => e.handle,
            Expression::Unary(e) => e.handle,
            Expression::Binary(e) => e.handle,
            Expression::Between(e) => e.handle,
            Expression::In(e) => e.handle,
            Expression::Like(e) => e.handle,
        }
    }

    /// Evaluates this node for the current row, writing the result into
    /// this node's own slot. Children are evaluated first (except where
    /// logical pruning skips one).
    pub fn compute(&self, ctx: &mut RuntimeContext) {
        match self {
            Expression::Column(_) => {
                // The Read operator already populated this slot; there is
                // nothing further to compute.
            }
            Expression::Literal(e) => e.handle.set_runtime(ctx, e.value.clone()),
            Expression::Unary(e) => compute_unary(e, ctx),
            Expression::Binary(e) => compute_binary(e, ctx),
            Expression::Between(e) => compute_between(e, ctx),
            Expression::In(e) => compute_in(e, ctx),
            Expression::Like(e) => compute_like(e, ctx),
        }
    }

    /// Computes this node and immediately reads its result back out of the
    /// slot, monomorphized to `T`.
    pub fn compute_and_get<T: VariantValue>(&self, ctx: &mut RuntimeContext) -> Option<T> {
        self.compute(ctx);
        self.handle().get::<T>(ctx)
    }
}

fn compute_unary(expr: &UnaryExpr, ctx: &mut RuntimeContext) {
    expr.operand.compute(ctx);
    let operand_handle = expr.operand.handle();
    let result = match expr.op {
        UnaryOp::Not => {
            let value = operand_handle.get::<bool>(ctx);
            RuntimeValue::Bool(value.map(|b| !b))
        }
        UnaryOp::IsNull => RuntimeValue::Bool(Some(operand_handle.is_null(ctx))),
        UnaryOp::IsNotNull => RuntimeValue::Bool(Some(!operand_handle.is_null(ctx))),
    };
    expr.handle.set_runtime(ctx, result);
}

fn compute_binary(expr: &BinaryExpr, ctx: &mut RuntimeContext) {
    if expr.op.is_logical() {
        compute_logical(expr, ctx);
        return;
    }

    expr.left.compute(ctx);
    expr.right.compute(ctx);
    let left = expr.left.handle().get_runtime(ctx);
    let right = expr.right.handle().get_runtime(ctx);

    let result = if expr.op.is_comparison() {
        compare(expr.op, &left, &right)
    } else {
        arithmetic(expr.op, &left, &right, expr.handle.data_type())
    };
    expr.handle.set_runtime(ctx, result);
}

/// `And`/`Or` with three-valued short-circuiting: a determining left
/// operand (`false` for `And`, `true` for `Or`) settles the result without
/// evaluating `right` at all when `logical_pruning` is enabled.
fn compute_logical(expr: &BinaryExpr, ctx: &mut RuntimeContext) {
    expr.left.compute(ctx);
    let left = expr.left.handle().get::<bool>(ctx);

    let determining = match expr.op {
        BinaryOp::And => left == Some(false),
        BinaryOp::Or => left == Some(true),
        _ => unreachable!("compute_logical only handles And/Or"),
    };

    if expr.logical_pruning && determining {
        expr.handle.set::<bool>(ctx, left);
        return;
    }

    expr.right.compute(ctx);
    let right = expr.right.handle().get::<bool>(ctx);

    let result = match expr.op {
        BinaryOp::And => three_valued_and(left, right),
        BinaryOp::Or => three_valued_or(left, right),
        _ => unreachable!("compute_logical only handles And/Or"),
    };
    expr.handle.set::<bool>(ctx, result);
}

fn three_valued_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn three_valued_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn compute_between(expr: &BetweenExpr, ctx: &mut RuntimeContext) {
    expr.value.compute(ctx);
    expr.low.compute(ctx);
    expr.high.compute(ctx);
    let value = expr.value.handle().get_runtime(ctx);
    let low = expr.low.handle().get_runtime(ctx);
    let high = expr.high.handle().get_runtime(ctx);

    let result = if value.is_null() || low.is_null() || high.is_null() {
        None
    } else {
        let ge_low = compare(BinaryOp::Ge, &value, &low).as_bool().unwrap_or(false);
        let le_high = compare(BinaryOp::Le, &value, &high).as_bool().unwrap_or(false);
        Some(ge_low && le_high)
    };
    expr.handle.set::<bool>(ctx, result);
}

fn compute_in(expr: &InExpr, ctx: &mut RuntimeContext) {
    expr.value.compute(ctx);
    let value = expr.value.handle().get_runtime(ctx);

    if value.is_null() {
        expr.handle.set::<bool>(ctx, None);
        return;
    }

    let mut saw_null = false;
    let mut found = false;
    for candidate_expr in &expr.list {
        candidate_expr.compute(ctx);
        let candidate = candidate_expr.handle().get_runtime(ctx);
        if candidate.is_null() {
            saw_null = true;
            continue;
        }
        if compare(BinaryOp::Eq, &value, &candidate).as_bool() == Some(true) {
            found = true;
            break;
        }
    }

    let result = if found {
        Some(true)
    } else if saw_null {
        None
    } else {
        Some(false)
    };
    expr.handle.set::<bool>(ctx, result);
}

fn compute_like(expr: &LikeExpr, ctx: &mut RuntimeContext) {
    expr.value.compute(ctx);
    let value = expr.value.handle().get::<std::sync::Arc<str>>(ctx);
    let result = value.map(|text| {
        let matched = expr.pattern.matches(&text);
        if expr.negated {
            !matched
        } else {
            matched
        }
    });
    expr.handle.set::<bool>(ctx, result);
}

fn compare(op: BinaryOp, left: &RuntimeValue, right: &RuntimeValue) -> RuntimeValue {
    if left.is_null() || right.is_null() {
        return RuntimeValue::Bool(None);
    }
    let ordering = if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        l.partial_cmp(r)
    } else if let RuntimeValue::Bool(Some(l)) = left {
        if let RuntimeValue::Bool(Some(r)) = right {
            l.partial_cmp(r)
        } else {
            None
        }
    } else {
        left.as_f64().and_then(|l| right.as_f64().and_then(|r| l.partial_cmp(&r)))
    };

    let Some(ordering) = ordering else {
        return RuntimeValue::Bool(None);
    };
    use std::cmp::Ordering::{Equal, Greater, Less};
    let result = match op {
        BinaryOp::Eq => ordering == Equal,
        BinaryOp::Ne => ordering != Equal,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Ge => ordering != Less,
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Le => ordering != Greater,
        _ => unreachable!("compare only handles comparison operators"),
    };
    RuntimeValue::Bool(Some(result))
}

/// Numeric dispatch for `+ - * / % ^`. Division and modulo by zero, and any
/// overflowing integer operation, produce NULL rather than a panic or an
/// error — there is no fallible path out of the per-row hot loop.
fn arithmetic(op: BinaryOp, left: &RuntimeValue, right: &RuntimeValue, result_type: DataType) -> RuntimeValue {
    if left.is_null() || right.is_null() {
        return RuntimeValue::null_of(result_type);
    }

    if op == BinaryOp::Pow || result_type.is_float() {
        let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
            return RuntimeValue::null_of(result_type);
        };
        let value = match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => {
                if r == 0.0 {
                    return RuntimeValue::null_of(result_type);
                }
                l / r
            }
            BinaryOp::Mod => {
                if r == 0.0 {
                    return RuntimeValue::null_of(result_type);
                }
                l % r
            }
            BinaryOp::Pow => l.powf(r),
            _ => unreachable!("arithmetic only handles numeric operators"),
        };
        return match result_type {
            DataType::Float32 => RuntimeValue::Float32(Some(value as f32)),
            _ => RuntimeValue::Float64(Some(value)),
        };
    }

    let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) else {
        return RuntimeValue::null_of(result_type);
    };
    let value = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                None
            } else {
                l.checked_div(r)
            }
        }
        BinaryOp::Mod => {
            if r == 0 {
                None
            } else {
                l.checked_rem(r)
            }
        }
        _ => unreachable!("arithmetic only handles numeric operators"),
    };
    match (result_type, value) {
        (DataType::Int32, Some(v)) => i32::try_from(v).map_or(RuntimeValue::Int32(None), |v| {
            RuntimeValue::Int32(Some(v))
        }),
        (DataType::Int32, None) => RuntimeValue::Int32(None),
        (_, Some(v)) => RuntimeValue::Int64(Some(v)),
        (_, None) => RuntimeValue::Int64(None),
    }
}
