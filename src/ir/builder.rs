//! Typed constructors for IR nodes.

use crate::{
    concrete_type::{ConcreteType, IntrinsicType},
    symbol::{FunctionSignature, Variable},
};

use super::{
    block::{Stmt, WriteMask},
    expr::{
        binary_op_result_type, unary_op_result_type, Const, Expr, IntrinsicBinaryOperation,
        IntrinsicUnaryOperation,
    },
    ExprRef, FunctionRef, IrArena, StmtRef, VarRef,
};

impl IrArena {
    pub fn constant(&mut self, c: Const) -> ExprRef {
        self.add_expr(Expr::Const(c), c.ty().into())
    }

    #[inline]
    pub fn const_sint(&mut self, v: i32) -> ExprRef {
        self.constant(Const::SInt(v))
    }

    #[inline]
    pub fn const_uint(&mut self, v: u32) -> ExprRef {
        self.constant(Const::UInt(v))
    }

    #[inline]
    pub fn const_float(&mut self, v: f32) -> ExprRef {
        self.constant(Const::Float(v))
    }

    #[inline]
    pub fn const_bool(&mut self, v: bool) -> ExprRef {
        self.constant(Const::Bool(v))
    }

    pub fn var_deref(&mut self, v: VarRef) -> ExprRef {
        let ty = self.variable(v).ty.clone();
        self.add_expr(Expr::VarDeref(v), ty)
    }

    pub fn array_ref(&mut self, source: ExprRef, index: ExprRef) -> ExprRef {
        let Some(ty) = self.expr_type(source).indexed_type() else {
            panic!(
                "cannot index a value of type {}",
                self.expr_type(source)
            );
        };

        self.add_expr(Expr::ArrayRef { source, index }, ty)
    }

    pub fn swizzle(&mut self, source: ExprRef, components: Vec<usize>) -> ExprRef {
        let Some(it) = self.expr_type(source).as_intrinsic() else {
            panic!("cannot swizzle a value of type {}", self.expr_type(source));
        };
        let Some(ty) = it.scalar_type().of_vector(components.len() as u8) else {
            panic!("invalid swizzle width {}", components.len());
        };

        self.add_expr(Expr::Swizzle(source, components), ty.into())
    }

    pub fn unary(&mut self, x: ExprRef, op: IntrinsicUnaryOperation) -> ExprRef {
        let ty = unary_op_result_type(op, self.expr_type(x));
        self.add_expr(Expr::IntrinsicUnaryOp(x, op), ty)
    }

    pub fn binary(
        &mut self,
        left: ExprRef,
        op: IntrinsicBinaryOperation,
        right: ExprRef,
    ) -> ExprRef {
        let ty = binary_op_result_type(op, self.expr_type(left), self.expr_type(right));
        self.add_expr(Expr::IntrinsicBinaryOp(left, op, right), ty)
    }

    #[inline]
    pub fn vector_extract(&mut self, vector: ExprRef, index: ExprRef) -> ExprRef {
        self.binary(vector, IntrinsicBinaryOperation::VectorExtract, index)
    }

    pub fn composite_insert(&mut self, source: ExprRef, value: ExprRef, index: ExprRef) -> ExprRef {
        let ty = self.expr_type(source).clone();
        self.add_expr(
            Expr::CompositeInsert {
                source,
                value,
                index,
            },
            ty,
        )
    }

    pub fn pure_intrinsic_call(
        &mut self,
        name: &'static str,
        args: Vec<ExprRef>,
        ty: impl Into<ConcreteType>,
    ) -> ExprRef {
        self.add_expr(Expr::PureIntrinsicCall(name, args), ty.into())
    }

    #[inline]
    pub fn declare(&mut self, v: VarRef) -> StmtRef {
        self.add_statement(Stmt::Declare(v))
    }

    /// Declares a fresh variable, returning both the variable and its declaration.
    pub fn declare_variable(&mut self, var: Variable) -> (VarRef, StmtRef) {
        let v = self.add_variable(var);
        (v, self.declare(v))
    }

    pub fn assign(&mut self, lhs: ExprRef, rhs: ExprRef) -> StmtRef {
        self.assign_if(lhs, rhs, None)
    }

    pub fn assign_if(&mut self, lhs: ExprRef, rhs: ExprRef, condition: Option<ExprRef>) -> StmtRef {
        assert!(
            self.expr(lhs).is_lvalue(),
            "assignment target must be an lvalue: {}",
            self.display_expr(lhs)
        );
        let write_mask = WriteMask::for_type(self.expr_type(lhs));

        self.add_statement(Stmt::Assign {
            lhs,
            rhs,
            condition,
            write_mask,
        })
    }

    pub fn call(
        &mut self,
        callee: FunctionRef,
        args: Vec<ExprRef>,
        result: Option<ExprRef>,
    ) -> StmtRef {
        assert_eq!(
            self.function(callee).parameters.len(),
            args.len(),
            "argument count mismatch calling {}",
            self.function(callee).name
        );

        self.add_statement(Stmt::Call {
            callee,
            args,
            result,
        })
    }

    /// Registers a function signature and its definition statement.
    pub fn define_function(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<VarRef>,
        return_type: impl Into<ConcreteType>,
        body: Vec<StmtRef>,
    ) -> (FunctionRef, StmtRef) {
        let f = self.add_function(FunctionSignature {
            name: name.into(),
            parameters,
            return_type: return_type.into(),
            body,
        });

        (f, self.add_statement(Stmt::FunctionDefinition(f)))
    }

    /// A `void` function with an empty body, used as a call target.
    pub fn void_function(&mut self, name: impl Into<String>, parameters: Vec<VarRef>) -> FunctionRef {
        self.define_function(name, parameters, IntrinsicType::Unit, Vec::new())
            .0
    }
}
