use crate::{
    concrete_type::{ConcreteType, IntrinsicType},
    symbol::meta::{Precision, VariableQualifiers},
    utils::{CommaSeparatedWriter, SwizzleElementWriter},
};

use super::{ExprRef, IrArena, VarRef};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Const {
    Bool(bool),
    UInt(u32),
    SInt(i32),
    Float(f32),
}
impl Const {
    pub const fn ty(&self) -> IntrinsicType {
        match self {
            Self::Bool(_) => IntrinsicType::Bool,
            Self::UInt(_) => IntrinsicType::UInt,
            Self::SInt(_) => IntrinsicType::SInt,
            Self::Float(_) => IntrinsicType::Float,
        }
    }

    #[inline(always)]
    pub const fn as_sint(&self) -> Option<i32> {
        match self {
            &Self::SInt(v) => Some(v),
            _ => None,
        }
    }
}
impl core::fmt::Display for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}u"),
            Self::SInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicUnaryOperation {
    Neg,
    BitNot,
    LogNot,
    UIntToSInt,
    SIntToUInt,
    SIntToFloat,
    FloatToSInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicBinaryOperation {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    LeftShift,
    RightShift,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LogAnd,
    LogOr,
    /// Reads one (possibly dynamically selected) component of a vector.
    VectorExtract,
}
impl IntrinsicBinaryOperation {
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge
        )
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::VectorExtract => "extract",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Const),
    VarDeref(VarRef),
    ArrayRef {
        source: ExprRef,
        index: ExprRef,
    },
    Swizzle(ExprRef, Vec<usize>),
    IntrinsicUnaryOp(ExprRef, IntrinsicUnaryOperation),
    IntrinsicBinaryOp(ExprRef, IntrinsicBinaryOperation, ExprRef),
    /// A copy of `source` with the component selected by `index` replaced by `value`.
    CompositeInsert {
        source: ExprRef,
        value: ExprRef,
        index: ExprRef,
    },
    PureIntrinsicCall(&'static str, Vec<ExprRef>),
}
impl Expr {
    pub fn relocate_operands(&mut self, mut relocator: impl FnMut(&mut ExprRef)) -> bool {
        match self {
            Self::Const(_) | Self::VarDeref(_) => false,
            Self::Swizzle(ref mut x, _) | Self::IntrinsicUnaryOp(ref mut x, _) => {
                let x0 = x.0;
                relocator(x);
                x.0 != x0
            }
            Self::ArrayRef {
                source: ref mut x,
                index: ref mut y,
            }
            | Self::IntrinsicBinaryOp(ref mut x, _, ref mut y) => {
                let (x0, y0) = (x.0, y.0);
                relocator(x);
                relocator(y);
                x.0 != x0 || y.0 != y0
            }
            Self::CompositeInsert {
                ref mut source,
                ref mut value,
                ref mut index,
            } => {
                let (s0, v0, i0) = (source.0, value.0, index.0);
                relocator(source);
                relocator(value);
                relocator(index);
                source.0 != s0 || value.0 != v0 || index.0 != i0
            }
            Self::PureIntrinsicCall(_, ref mut args) => args.iter_mut().fold(false, |a, r| {
                let x0 = r.0;
                relocator(r);
                r.0 != x0 || a
            }),
        }
    }

    pub fn operands(&self) -> Vec<ExprRef> {
        match self {
            Self::Const(_) | Self::VarDeref(_) => Vec::new(),
            &Self::Swizzle(x, _) | &Self::IntrinsicUnaryOp(x, _) => vec![x],
            &Self::ArrayRef {
                source: x,
                index: y,
            }
            | &Self::IntrinsicBinaryOp(x, _, y) => vec![x, y],
            &Self::CompositeInsert {
                source,
                value,
                index,
            } => vec![source, value, index],
            Self::PureIntrinsicCall(_, args) => args.clone(),
        }
    }

    /// Whether the expression can name a storage location.
    pub const fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Self::VarDeref(_) | Self::ArrayRef { .. } | Self::Swizzle(_, _)
        )
    }
}

fn fold_unary(value: Const, op: IntrinsicUnaryOperation) -> Option<Const> {
    match (op, value) {
        (IntrinsicUnaryOperation::Neg, Const::SInt(v)) => Some(Const::SInt(v.wrapping_neg())),
        (IntrinsicUnaryOperation::Neg, Const::Float(v)) => Some(Const::Float(-v)),
        (IntrinsicUnaryOperation::BitNot, Const::SInt(v)) => Some(Const::SInt(!v)),
        (IntrinsicUnaryOperation::BitNot, Const::UInt(v)) => Some(Const::UInt(!v)),
        (IntrinsicUnaryOperation::LogNot, Const::Bool(v)) => Some(Const::Bool(!v)),
        (IntrinsicUnaryOperation::UIntToSInt, Const::UInt(v)) => Some(Const::SInt(v as i32)),
        (IntrinsicUnaryOperation::SIntToUInt, Const::SInt(v)) => Some(Const::UInt(v as u32)),
        (IntrinsicUnaryOperation::SIntToFloat, Const::SInt(v)) => Some(Const::Float(v as f32)),
        (IntrinsicUnaryOperation::FloatToSInt, Const::Float(v)) => Some(Const::SInt(v as i32)),
        _ => None,
    }
}

fn fold_binary(left: Const, op: IntrinsicBinaryOperation, right: Const) -> Option<Const> {
    match (left, right) {
        (Const::SInt(l), Const::SInt(r)) => match op {
            IntrinsicBinaryOperation::Add => Some(Const::SInt(l.wrapping_add(r))),
            IntrinsicBinaryOperation::Sub => Some(Const::SInt(l.wrapping_sub(r))),
            IntrinsicBinaryOperation::Mul => Some(Const::SInt(l.wrapping_mul(r))),
            IntrinsicBinaryOperation::Div => l.checked_div(r).map(Const::SInt),
            IntrinsicBinaryOperation::Rem => l.checked_rem(r).map(Const::SInt),
            IntrinsicBinaryOperation::BitAnd => Some(Const::SInt(l & r)),
            IntrinsicBinaryOperation::BitOr => Some(Const::SInt(l | r)),
            IntrinsicBinaryOperation::BitXor => Some(Const::SInt(l ^ r)),
            IntrinsicBinaryOperation::LeftShift => l.checked_shl(r as u32).map(Const::SInt),
            IntrinsicBinaryOperation::RightShift => l.checked_shr(r as u32).map(Const::SInt),
            IntrinsicBinaryOperation::Eq => Some(Const::Bool(l == r)),
            IntrinsicBinaryOperation::Ne => Some(Const::Bool(l != r)),
            IntrinsicBinaryOperation::Lt => Some(Const::Bool(l < r)),
            IntrinsicBinaryOperation::Gt => Some(Const::Bool(l > r)),
            IntrinsicBinaryOperation::Le => Some(Const::Bool(l <= r)),
            IntrinsicBinaryOperation::Ge => Some(Const::Bool(l >= r)),
            _ => None,
        },
        (Const::UInt(l), Const::UInt(r)) => match op {
            IntrinsicBinaryOperation::Add => Some(Const::UInt(l.wrapping_add(r))),
            IntrinsicBinaryOperation::Sub => Some(Const::UInt(l.wrapping_sub(r))),
            IntrinsicBinaryOperation::Mul => Some(Const::UInt(l.wrapping_mul(r))),
            IntrinsicBinaryOperation::Div => l.checked_div(r).map(Const::UInt),
            IntrinsicBinaryOperation::Rem => l.checked_rem(r).map(Const::UInt),
            IntrinsicBinaryOperation::BitAnd => Some(Const::UInt(l & r)),
            IntrinsicBinaryOperation::BitOr => Some(Const::UInt(l | r)),
            IntrinsicBinaryOperation::BitXor => Some(Const::UInt(l ^ r)),
            IntrinsicBinaryOperation::LeftShift => l.checked_shl(r).map(Const::UInt),
            IntrinsicBinaryOperation::RightShift => l.checked_shr(r).map(Const::UInt),
            IntrinsicBinaryOperation::Eq => Some(Const::Bool(l == r)),
            IntrinsicBinaryOperation::Ne => Some(Const::Bool(l != r)),
            IntrinsicBinaryOperation::Lt => Some(Const::Bool(l < r)),
            IntrinsicBinaryOperation::Gt => Some(Const::Bool(l > r)),
            IntrinsicBinaryOperation::Le => Some(Const::Bool(l <= r)),
            IntrinsicBinaryOperation::Ge => Some(Const::Bool(l >= r)),
            _ => None,
        },
        (Const::Bool(l), Const::Bool(r)) => match op {
            IntrinsicBinaryOperation::LogAnd => Some(Const::Bool(l && r)),
            IntrinsicBinaryOperation::LogOr => Some(Const::Bool(l || r)),
            IntrinsicBinaryOperation::Eq => Some(Const::Bool(l == r)),
            IntrinsicBinaryOperation::Ne => Some(Const::Bool(l != r)),
            _ => None,
        },
        _ => None,
    }
}

impl IrArena {
    /// Evaluates `e` at compile time, if it only depends on constants and read-only
    /// variables with a known value.
    pub fn constant_value(&self, e: ExprRef) -> Option<Const> {
        match self.expr(e) {
            &Expr::Const(c) => Some(c),
            &Expr::VarDeref(v) => {
                let var = self.variable(v);
                if var
                    .attribute
                    .qualifiers
                    .contains(VariableQualifiers::READ_ONLY)
                {
                    var.constant_value
                } else {
                    None
                }
            }
            &Expr::IntrinsicUnaryOp(x, op) => fold_unary(self.constant_value(x)?, op),
            &Expr::IntrinsicBinaryOp(l, op, r) => {
                fold_binary(self.constant_value(l)?, op, self.constant_value(r)?)
            }
            Expr::ArrayRef { .. }
            | Expr::Swizzle(_, _)
            | Expr::CompositeInsert { .. }
            | Expr::PureIntrinsicCall(_, _) => None,
        }
    }

    /// Precision an expression inherits from the storage it reads.
    pub fn expr_precision(&self, e: ExprRef) -> Precision {
        match self.expr(e) {
            &Expr::VarDeref(v) => self.variable(v).attribute.precision,
            &Expr::ArrayRef { source, .. } | &Expr::Swizzle(source, _) => {
                self.expr_precision(source)
            }
            _ => Precision::Undefined,
        }
    }

    #[inline]
    pub fn display_expr(&self, e: ExprRef) -> ExprDisplay<'_> {
        ExprDisplay(self, e)
    }
}

pub struct ExprDisplay<'a>(pub &'a IrArena, pub ExprRef);
impl core::fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arena = self.0;
        let d = |e| arena.display_expr(e);

        match arena.expr(self.1) {
            Expr::Const(c) => write!(f, "{c}"),
            &Expr::VarDeref(v) => f.write_str(&arena.variable(v).name),
            &Expr::ArrayRef { source, index } => write!(f, "{}[{}]", d(source), d(index)),
            &Expr::Swizzle(source, ref xs) => {
                write!(f, "{}.{}", d(source), SwizzleElementWriter(xs))
            }
            &Expr::IntrinsicUnaryOp(x, op) => match op {
                IntrinsicUnaryOperation::Neg => write!(f, "-({})", d(x)),
                IntrinsicUnaryOperation::BitNot => write!(f, "~({})", d(x)),
                IntrinsicUnaryOperation::LogNot => write!(f, "!({})", d(x)),
                IntrinsicUnaryOperation::UIntToSInt | IntrinsicUnaryOperation::FloatToSInt => {
                    write!(f, "int({})", d(x))
                }
                IntrinsicUnaryOperation::SIntToUInt => write!(f, "uint({})", d(x)),
                IntrinsicUnaryOperation::SIntToFloat => write!(f, "float({})", d(x)),
            },
            &Expr::IntrinsicBinaryOp(v, IntrinsicBinaryOperation::VectorExtract, i) => {
                write!(f, "extract({}, {})", d(v), d(i))
            }
            &Expr::IntrinsicBinaryOp(l, op, r) => write!(f, "({} {} {})", d(l), op.symbol(), d(r)),
            &Expr::CompositeInsert {
                source,
                value,
                index,
            } => write!(f, "insert({}, {}, {})", d(source), d(value), d(index)),
            Expr::PureIntrinsicCall(name, args) => {
                let args = args.iter().map(|&a| d(a)).collect::<Vec<_>>();
                write!(f, "{name}({})", CommaSeparatedWriter(&args))
            }
        }
    }
}

/// Result type of an intrinsic binary operation over the given operand types.
pub(crate) fn binary_op_result_type(
    op: IntrinsicBinaryOperation,
    left: &ConcreteType,
    right: &ConcreteType,
) -> ConcreteType {
    match op {
        _ if op.is_comparison() => IntrinsicType::Bool.into(),
        IntrinsicBinaryOperation::LogAnd | IntrinsicBinaryOperation::LogOr => {
            IntrinsicType::Bool.into()
        }
        IntrinsicBinaryOperation::VectorExtract => match left.as_intrinsic() {
            Some(it) if it.is_vector() => it.component_type().into(),
            _ => panic!("vector extract requires a vector operand, got {left}"),
        },
        // scalar op vector broadcasts to the vector
        _ => match (left.as_intrinsic(), right.as_intrinsic()) {
            (Some(l), Some(r)) if !l.is_vector() && r.is_vector() => right.clone(),
            _ => left.clone(),
        },
    }
}

pub(crate) fn unary_op_result_type(op: IntrinsicUnaryOperation, x: &ConcreteType) -> ConcreteType {
    match op {
        IntrinsicUnaryOperation::Neg | IntrinsicUnaryOperation::BitNot => x.clone(),
        IntrinsicUnaryOperation::LogNot => IntrinsicType::Bool.into(),
        IntrinsicUnaryOperation::UIntToSInt | IntrinsicUnaryOperation::FloatToSInt => {
            IntrinsicType::SInt.into()
        }
        IntrinsicUnaryOperation::SIntToUInt => IntrinsicType::UInt.into(),
        IntrinsicUnaryOperation::SIntToFloat => IntrinsicType::Float.into(),
    }
}
