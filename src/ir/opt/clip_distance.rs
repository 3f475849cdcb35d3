//! Reshapes `gl_ClipDistance` from the array of floats GLSL declares into the
//! array of vec4s hardware usually implements, with four distances packed into
//! each vector. The declaration is replaced by `gl_ClipDistanceMESA` and every
//! access is rewritten to address a vector and a component:
//!
//! ```text
//! gl_ClipDistance[i]  =>  extract(gl_ClipDistanceMESA[i >> 2], i & 3)
//! ```
//!
//! Geometry shaders additionally see the per-vertex input
//! `gl_in[n].gl_ClipDistance`, an array of such arrays, which is packed along its
//! inner dimension.

use crate::{
    concrete_type::{ConcreteType, IntrinsicType},
    ir::{
        block::{StatementCursor, Stmt, WriteMask},
        expr::{Expr, IntrinsicBinaryOperation, IntrinsicUnaryOperation},
        ExprRef, IrArena, Shader, StmtRef, VarRef,
    },
    symbol::{
        meta::{Precision, ShaderModel, VariableMode},
        Variable,
    },
    utils::roundup2,
};

pub const CLIP_DISTANCE_NAME: &str = "gl_ClipDistance";
pub const PACKED_CLIP_DISTANCE_NAME: &str = "gl_ClipDistanceMESA";
const INDEX_TEMPORARY_NAME: &str = "clip_distance_index";
const ARGUMENT_TEMPORARY_NAME: &str = "temp_clip_distance";
const RESULT_TEMPORARY_NAME: &str = "clip_distance_result";

/// Number of vec4s needed to hold `logical_length` floats.
#[inline(always)]
pub const fn packed_length(logical_length: usize) -> usize {
    roundup2(logical_length, 4) / 4
}

struct ClipDistanceLowering<'x> {
    arena: &'x mut IrArena,
    stage: ShaderModel,
    /// 1D array: vertex/geometry output and fragment input.
    old_clip_distance_1d: Option<VarRef>,
    /// 2D array: geometry input only. Both can be present in one geometry shader.
    old_clip_distance_2d: Option<VarRef>,
    new_clip_distance_1d: Option<VarRef>,
    new_clip_distance_2d: Option<VarRef>,
    /// Edits against the statement currently being visited.
    cursor: StatementCursor,
    modified: bool,
}

/// Lowers `gl_ClipDistance` in `shader`. Returns whether anything was rewritten.
pub fn lower_clip_distance(shader: &mut Shader) -> bool {
    let mut lowering = ClipDistanceLowering {
        arena: &mut shader.arena,
        stage: shader.stage,
        old_clip_distance_1d: None,
        old_clip_distance_2d: None,
        new_clip_distance_1d: None,
        new_clip_distance_2d: None,
        cursor: StatementCursor::new(),
        modified: false,
    };

    let instructions = core::mem::take(&mut shader.instructions);
    shader.instructions = lowering.visit_statement_list(instructions);

    let modified = lowering.modified;
    let new_vars = [lowering.new_clip_distance_1d, lowering.new_clip_distance_2d];
    for v in new_vars.into_iter().flatten() {
        let name = &shader.arena.variable(v).name;
        if !shader.symbols.add_variable(name, v) {
            println!(
                "[LowerClipDistance] {name} already registered, keeping the first declaration ({v:?} not added)"
            );
        }
    }

    modified
}

impl ClipDistanceLowering<'_> {
    fn visit_statement_list(&mut self, list: Vec<StmtRef>) -> Vec<StmtRef> {
        let mut out = Vec::with_capacity(list.len());

        for s in list {
            let outer = core::mem::take(&mut self.cursor);
            self.visit_statement(s);
            let cursor = core::mem::replace(&mut self.cursor, outer);
            cursor.splice_into(s, &mut out);
        }

        out
    }

    fn visit_statement(&mut self, s: StmtRef) {
        match self.arena.statement(s).clone() {
            Stmt::Declare(v) => self.visit_declaration(v),
            Stmt::FunctionDefinition(f) => {
                let body = core::mem::take(&mut self.arena.function_mut(f).body);
                let body = self.visit_statement_list(body);
                self.arena.function_mut(f).body = body;
            }
            Stmt::Assign { .. } => self.visit_assignment(s),
            Stmt::Call { .. } => self.visit_call(s),
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.visit_rvalue(condition);
                let then_body = self.visit_statement_list(then_body);
                let else_body = self.visit_statement_list(else_body);
                *self.arena.statement_mut(s) = Stmt::If {
                    condition,
                    then_body,
                    else_body,
                };
            }
            Stmt::Loop(body) => {
                let body = self.visit_statement_list(body);
                *self.arena.statement_mut(s) = Stmt::Loop(body);
            }
            Stmt::Return(Some(x)) => {
                let x = self.visit_rvalue(x);
                *self.arena.statement_mut(s) = Stmt::Return(Some(x));
            }
            Stmt::Discard(Some(c)) => {
                let c = self.visit_rvalue(c);
                *self.arena.statement_mut(s) = Stmt::Discard(Some(c));
            }
            Stmt::Return(None)
            | Stmt::Discard(None)
            | Stmt::Break
            | Stmt::Continue
            | Stmt::EmitVertex => (),
        }
    }

    /// Replaces a declaration of `gl_ClipDistance` with one of `gl_ClipDistanceMESA`.
    fn visit_declaration(&mut self, v: VarRef) {
        let var = self.arena.variable(v);
        if var.name != CLIP_DISTANCE_NAME {
            return;
        }
        let Some(element_ty) = var.ty.element_type() else {
            panic!("{CLIP_DISTANCE_NAME} must be declared as an array, got {}", var.ty);
        };
        let outer_length = var.ty.array_size().unwrap_or_default();

        if !element_ty.is_array() {
            if self.old_clip_distance_1d.is_some() {
                return;
            }
            assert!(
                element_ty.is_intrinsic(IntrinsicType::Float),
                "{CLIP_DISTANCE_NAME} must be an array of float, got {}",
                var.ty
            );

            let packed_ty = ConcreteType::array_of(IntrinsicType::Float4, packed_length(outer_length));
            let new_var = self.replace_declaration(v, packed_ty);
            self.old_clip_distance_1d = Some(v);
            self.new_clip_distance_1d = Some(new_var);
        } else {
            assert!(
                var.attribute.mode == VariableMode::ShaderIn
                    && self.stage.has_multi_vertex_inputs(),
                "2D {CLIP_DISTANCE_NAME} is only valid as a geometry shader input"
            );
            if self.old_clip_distance_2d.is_some() {
                return;
            }
            let inner_length = match element_ty {
                ConcreteType::Array(e, n) if e.is_intrinsic(IntrinsicType::Float) => *n,
                _ => panic!(
                    "{CLIP_DISTANCE_NAME} must be an array of float arrays, got {}",
                    var.ty
                ),
            };

            let packed_ty = ConcreteType::array_of(
                ConcreteType::array_of(IntrinsicType::Float4, packed_length(inner_length)),
                outer_length,
            );
            let new_var = self.replace_declaration(v, packed_ty);
            self.old_clip_distance_2d = Some(v);
            self.new_clip_distance_2d = Some(new_var);
        }
    }

    fn replace_declaration(&mut self, v: VarRef, packed_ty: ConcreteType) -> VarRef {
        // the clone inherits mode, precision, interpolation and qualifiers
        let mut packed = self.arena.variable(v).clone();
        packed.name = String::from(PACKED_CLIP_DISTANCE_NAME);
        packed.ty = packed_ty;
        packed.attribute.max_array_access /= 4;

        println!(
            "[LowerClipDistance] {v:?}: {} -> {}",
            self.arena.variable(v).ty,
            packed.ty
        );
        let (new_var, decl) = self.arena.declare_variable(packed);
        self.cursor.replace_with(decl);
        self.modified = true;

        new_var
    }

    /// Builds the vector index and component index into `gl_ClipDistanceMESA` for an
    /// index previously used on `gl_ClipDistance`.
    fn create_indices(&mut self, old_index: ExprRef) -> (ExprRef, ExprRef) {
        let old_index = match self.arena.expr_type(old_index).as_intrinsic() {
            Some(IntrinsicType::SInt) => old_index,
            // the shift and mask below are only defined on signed ints
            Some(IntrinsicType::UInt) => self
                .arena
                .unary(old_index, IntrinsicUnaryOperation::UIntToSInt),
            _ => panic!(
                "{CLIP_DISTANCE_NAME} index must be an int or uint, got {}",
                self.arena.expr_type(old_index)
            ),
        };

        if let Some(k) = self
            .arena
            .constant_value(old_index)
            .and_then(|c| c.as_sint())
        {
            let array_index = self.arena.const_sint(k / 4);
            let swizzle_index = self.arena.const_sint(k % 4);
            return (array_index, swizzle_index);
        }

        // evaluate the index exactly once
        let (index_var, decl) = self.arena.declare_variable(Variable::temporary(
            INDEX_TEMPORARY_NAME,
            IntrinsicType::SInt,
            Precision::Undefined,
        ));
        let index_ref = self.arena.var_deref(index_var);
        let capture = self.arena.assign(index_ref, old_index);
        self.cursor.insert_before(decl);
        self.cursor.insert_before(capture);

        let index_ref = self.arena.var_deref(index_var);
        let two = self.arena.const_sint(2);
        let array_index = self
            .arena
            .binary(index_ref, IntrinsicBinaryOperation::RightShift, two);
        let index_ref = self.arena.var_deref(index_var);
        let three = self.arena.const_sint(3);
        let swizzle_index = self
            .arena
            .binary(index_ref, IntrinsicBinaryOperation::BitAnd, three);

        (array_index, swizzle_index)
    }

    /// Whether `e` denotes a whole logical array of floats: `gl_ClipDistance` itself
    /// (1D) or one vertex's slice `gl_ClipDistance[n]` (2D).
    fn is_clip_distance_vec8(&self, e: ExprRef) -> bool {
        if let Some(old_1d) = self.old_clip_distance_1d {
            if *self.arena.expr(e) == Expr::VarDeref(old_1d) {
                return true;
            }
        }
        if let Some(old_2d) = self.old_clip_distance_2d {
            assert_eq!(self.stage, ShaderModel::GeometryShader);

            if let &Expr::ArrayRef { source, .. } = self.arena.expr(e) {
                if *self.arena.expr(source) == Expr::VarDeref(old_2d) {
                    return true;
                }
            }
        }

        false
    }

    /// The packed counterpart of a whole logical array reference, if `e` is one.
    fn lower_clip_distance_vec8(&mut self, e: ExprRef) -> Option<ExprRef> {
        if let (Some(old_1d), Some(new_1d)) =
            (self.old_clip_distance_1d, self.new_clip_distance_1d)
        {
            if *self.arena.expr(e) == Expr::VarDeref(old_1d) {
                return Some(self.arena.var_deref(new_1d));
            }
        }
        if let (Some(old_2d), Some(new_2d)) =
            (self.old_clip_distance_2d, self.new_clip_distance_2d)
        {
            assert_eq!(self.stage, ShaderModel::GeometryShader);

            if let &Expr::ArrayRef { source, index } = self.arena.expr(e) {
                if *self.arena.expr(source) == Expr::VarDeref(old_2d) {
                    let packed = self.arena.var_deref(new_2d);
                    return Some(self.arena.array_ref(packed, index));
                }
            }
        }

        None
    }

    /// Rewrites `e` itself (not its operands) if it reads one float of the logical
    /// array.
    fn handle_rvalue(&mut self, e: ExprRef) -> ExprRef {
        let &Expr::ArrayRef { source, index } = self.arena.expr(e) else {
            return e;
        };
        let Some(lowered_vec8) = self.lower_clip_distance_vec8(source) else {
            return e;
        };

        self.modified = true;
        let (array_index, swizzle_index) = self.create_indices(index);
        let vector = self.arena.array_ref(lowered_vec8, array_index);

        self.arena.vector_extract(vector, swizzle_index)
    }

    /// Rewrites the operands of `e` bottom-up, then `e` itself.
    fn visit_rvalue(&mut self, e: ExprRef) -> ExprRef {
        self.visit_rvalue_operands(e);
        self.handle_rvalue(e)
    }

    fn visit_rvalue_operands(&mut self, e: ExprRef) {
        let mut expr = self.arena.expr(e).clone();
        if expr.relocate_operands(|x| *x = self.visit_rvalue(*x)) {
            *self.arena.expr_mut(e) = expr;
        }
    }

    /// Turns a write through `extract(gl_ClipDistanceMESA[i], j)` into a whole-vector
    /// store of `insert(gl_ClipDistanceMESA[i], rhs, j)`.
    fn fix_lhs(&mut self, s: StmtRef) {
        let Stmt::Assign {
            lhs,
            rhs,
            condition,
            ..
        } = *self.arena.statement(s)
        else {
            unreachable!("fix_lhs on a non-assignment statement");
        };
        let &Expr::IntrinsicBinaryOp(vector, op, swizzle_index) = self.arena.expr(lhs) else {
            return;
        };

        assert_eq!(op, IntrinsicBinaryOperation::VectorExtract);
        assert!(matches!(self.arena.expr(vector), Expr::ArrayRef { .. }));
        assert!(self.arena.expr_type(vector).is_intrinsic(IntrinsicType::Float4));

        let old_value = self.arena.clone_expr(vector);
        let new_rhs = self.arena.composite_insert(old_value, rhs, swizzle_index);
        *self.arena.statement_mut(s) = Stmt::Assign {
            lhs: vector,
            rhs: new_rhs,
            condition,
            write_mask: WriteMask::XYZW,
        };
    }

    fn set_assignment_operands(&mut self, s: StmtRef, new_lhs: ExprRef, new_rhs: ExprRef) {
        if let Stmt::Assign { lhs, rhs, .. } = self.arena.statement_mut(s) {
            *lhs = new_lhs;
            *rhs = new_rhs;
        }
    }

    /// Lowers one assignment. Whole-array copies are unrolled into one assignment per
    /// element, queued before the statement, and the statement itself is removed.
    fn visit_assignment(&mut self, s: StmtRef) {
        let Stmt::Assign {
            lhs, rhs, condition, ..
        } = self.arena.statement(s).clone()
        else {
            unreachable!("visit_assignment on a non-assignment statement");
        };

        self.visit_rvalue_operands(lhs);
        let rhs = self.visit_rvalue(rhs);
        let condition = condition.map(|c| self.visit_rvalue(c));
        if let Stmt::Assign { condition: c, .. } = self.arena.statement_mut(s) {
            *c = condition;
        }
        self.set_assignment_operands(s, lhs, rhs);

        if self.is_clip_distance_vec8(lhs) || self.is_clip_distance_vec8(rhs) {
            self.expand_whole_array_assignment(lhs, rhs, condition);
            self.cursor.remove();
            return;
        }

        // the lhs is lowered as if it were read, then fixed up into a vector store
        let lhs = self.handle_rvalue(lhs);
        self.set_assignment_operands(s, lhs, rhs);
        self.fix_lhs(s);
    }

    fn expand_whole_array_assignment(
        &mut self,
        lhs: ExprRef,
        rhs: ExprRef,
        condition: Option<ExprRef>,
    ) {
        let Some(array_size) = self.arena.expr_type(lhs).array_size() else {
            panic!(
                "whole {CLIP_DISTANCE_NAME} assignment to a non-array: {}",
                self.arena.display_expr(lhs)
            );
        };
        println!(
            "[LowerClipDistance] unrolling {} = {} into {array_size} assignments",
            self.arena.display_expr(lhs),
            self.arena.display_expr(rhs)
        );

        // lvalues and rvalues here are side-effect free, so duplicating them per
        // element is safe
        for i in 0..array_size {
            let lhs_clone = self.arena.clone_expr(lhs);
            let lhs_index = self.arena.const_sint(i as i32);
            let new_lhs = self.arena.array_ref(lhs_clone, lhs_index);
            let rhs_clone = self.arena.clone_expr(rhs);
            let rhs_index = self.arena.const_sint(i as i32);
            let new_rhs = self.arena.array_ref(rhs_clone, rhs_index);
            let new_rhs = self.handle_rvalue(new_rhs);
            let condition = condition.map(|c| self.arena.clone_expr(c));

            // the lhs is lowered after the assignment exists, since the extract it
            // may turn into is not a valid assignment target
            let assign = self.arena.assign_if(new_lhs, new_rhs, condition);
            let new_lhs = self.handle_rvalue(new_lhs);
            self.set_assignment_operands(assign, new_lhs, new_rhs);
            self.fix_lhs(assign);

            self.cursor.insert_before(assign);
        }
    }

    /// Lowers an assignment synthesized mid-traversal, which the list walk will not
    /// reach by itself. Returns the statements that replace it, in order.
    fn lower_new_assignment(&mut self, s: StmtRef) -> Vec<StmtRef> {
        let outer = core::mem::take(&mut self.cursor);
        self.visit_assignment(s);
        let cursor = core::mem::replace(&mut self.cursor, outer);

        let mut out = Vec::new();
        cursor.splice_into(s, &mut out);
        out
    }

    /// Passes whole logical arrays to calls through a temporary of the logical type,
    /// copied from and/or back to the packed array around the call. Single floats
    /// bound to `out`/`inout` parameters get a scalar temporary the same way.
    fn visit_call(&mut self, s: StmtRef) {
        let Stmt::Call {
            callee,
            mut args,
            result,
        } = self.arena.statement(s).clone()
        else {
            unreachable!("visit_call on a non-call statement");
        };

        for &a in args.iter() {
            self.visit_rvalue_operands(a);
        }
        if let Some(r) = result {
            self.visit_rvalue_operands(r);
        }

        let parameters = self.arena.function(callee).parameters.clone();
        assert_eq!(parameters.len(), args.len());
        for (&formal, actual) in parameters.iter().zip(args.iter_mut()) {
            let mode = self.arena.variable(formal).attribute.mode;
            if mode.accepts_output() && self.is_clip_distance_element(*actual) {
                // a single float written by the callee has no addressable home in
                // the packed array
                *actual = self.materialize_element(
                    *actual,
                    ARGUMENT_TEMPORARY_NAME,
                    mode.accepts_input(),
                );
                continue;
            }
            if !self.is_clip_distance_vec8(*actual) {
                continue;
            }

            let original = *actual;
            let ty = self.arena.expr_type(original).clone();
            let precision = self.arena.expr_precision(original);
            let (temp, decl) = self.arena.declare_variable(Variable::temporary(
                ARGUMENT_TEMPORARY_NAME,
                ty,
                precision,
            ));
            self.cursor.insert_before(decl);
            *actual = self.arena.var_deref(temp);

            println!(
                "[LowerClipDistance] materializing {} as {:?} argument of {}",
                self.arena.display_expr(original),
                mode,
                self.arena.function(callee).name
            );
            if mode.accepts_input() {
                let temp_ref = self.arena.var_deref(temp);
                let source = self.arena.clone_expr(original);
                let copy_in = self.arena.assign(temp_ref, source);
                let lowered = self.lower_new_assignment(copy_in);
                self.cursor.insert_before_all(lowered);
            }
            if mode.accepts_output() {
                let dest = self.arena.clone_expr(original);
                let temp_ref = self.arena.var_deref(temp);
                let copy_out = self.arena.assign(dest, temp_ref);
                let lowered = self.lower_new_assignment(copy_out);
                self.cursor.insert_after_all(lowered);
            }
        }

        for a in args.iter_mut() {
            *a = self.handle_rvalue(*a);
        }
        let result = result.map(|r| self.materialize_call_result(r));

        *self.arena.statement_mut(s) = Stmt::Call {
            callee,
            args,
            result,
        };
    }

    /// A call cannot return straight into the packed array, whether the result
    /// names one float of it or a whole logical array, so such a result goes through
    /// a temporary stored back after the call.
    fn materialize_call_result(&mut self, r: ExprRef) -> ExprRef {
        if self.is_clip_distance_element(r) {
            return self.materialize_element(r, RESULT_TEMPORARY_NAME, false);
        }
        if !self.is_clip_distance_vec8(r) {
            return r;
        }

        let ty = self.arena.expr_type(r).clone();
        let precision = self.arena.expr_precision(r);
        let (temp, decl) = self
            .arena
            .declare_variable(Variable::temporary(RESULT_TEMPORARY_NAME, ty, precision));
        self.cursor.insert_before(decl);

        let temp_ref = self.arena.var_deref(temp);
        let store = self.arena.assign(r, temp_ref);
        let lowered = self.lower_new_assignment(store);
        self.cursor.insert_after_all(lowered);

        self.arena.var_deref(temp)
    }

    /// Replaces a float of the logical array written by the current call with a
    /// scalar temporary, stored back into its vector after the call. The element
    /// index is captured before the call so the callee cannot redirect the store.
    fn materialize_element(&mut self, element: ExprRef, name: &str, copy_in: bool) -> ExprRef {
        let ty = self.arena.expr_type(element).clone();
        let precision = self.arena.expr_precision(element);
        let (temp, decl) = self
            .arena
            .declare_variable(Variable::temporary(name, ty, precision));
        self.cursor.insert_before(decl);

        let lowered = self.handle_rvalue(element);
        if copy_in {
            let temp_ref = self.arena.var_deref(temp);
            let current = self.arena.clone_expr(lowered);
            let load = self.arena.assign(temp_ref, current);
            self.cursor.insert_before(load);
        }

        let temp_ref = self.arena.var_deref(temp);
        let store = self.arena.add_statement(Stmt::Assign {
            lhs: lowered,
            rhs: temp_ref,
            condition: None,
            write_mask: WriteMask::X,
        });
        self.fix_lhs(store);
        self.cursor.insert_after_all([store]);

        self.arena.var_deref(temp)
    }

    /// Whether `e` reads one float of the logical array, i.e. `handle_rvalue` would
    /// rewrite it.
    fn is_clip_distance_element(&self, e: ExprRef) -> bool {
        match *self.arena.expr(e) {
            Expr::ArrayRef { source, .. } => self.is_clip_distance_vec8(source),
            _ => false,
        }
    }
}
