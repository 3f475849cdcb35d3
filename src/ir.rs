use std::collections::HashSet;

use block::Stmt;
use expr::Expr;

use crate::{
    concrete_type::ConcreteType,
    scope::SymbolScope,
    symbol::{meta::ShaderModel, FunctionSignature, Variable},
};

pub mod block;
pub mod builder;
pub mod expr;
pub mod opt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ExprRef(pub usize);
impl core::fmt::Debug for ExprRef {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StmtRef(pub usize);
impl core::fmt::Debug for StmtRef {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VarRef(pub usize);
impl core::fmt::Debug for VarRef {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FunctionRef(pub usize);
impl core::fmt::Debug for FunctionRef {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Owner of every node of one shader. Nodes are never freed individually: a
/// rewrite detaches superseded nodes and leaves them in place until the whole
/// arena is dropped.
#[derive(Debug, Clone, Default)]
pub struct IrArena {
    pub expressions: Vec<(Expr, ConcreteType)>,
    pub statements: Vec<Stmt>,
    pub variables: Vec<Variable>,
    pub functions: Vec<FunctionSignature>,
}
impl IrArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expr(&mut self, expr: Expr, ty: ConcreteType) -> ExprRef {
        self.expressions.push((expr, ty));

        ExprRef(self.expressions.len() - 1)
    }

    #[inline(always)]
    pub fn expr(&self, r: ExprRef) -> &Expr {
        &self.expressions[r.0].0
    }

    #[inline(always)]
    pub fn expr_mut(&mut self, r: ExprRef) -> &mut Expr {
        &mut self.expressions[r.0].0
    }

    #[inline(always)]
    pub fn expr_type(&self, r: ExprRef) -> &ConcreteType {
        &self.expressions[r.0].1
    }

    pub fn add_statement(&mut self, stmt: Stmt) -> StmtRef {
        self.statements.push(stmt);

        StmtRef(self.statements.len() - 1)
    }

    #[inline(always)]
    pub fn statement(&self, r: StmtRef) -> &Stmt {
        &self.statements[r.0]
    }

    #[inline(always)]
    pub fn statement_mut(&mut self, r: StmtRef) -> &mut Stmt {
        &mut self.statements[r.0]
    }

    pub fn add_variable(&mut self, var: Variable) -> VarRef {
        self.variables.push(var);

        VarRef(self.variables.len() - 1)
    }

    #[inline(always)]
    pub fn variable(&self, r: VarRef) -> &Variable {
        &self.variables[r.0]
    }

    #[inline(always)]
    pub fn variable_mut(&mut self, r: VarRef) -> &mut Variable {
        &mut self.variables[r.0]
    }

    pub fn add_function(&mut self, f: FunctionSignature) -> FunctionRef {
        self.functions.push(f);

        FunctionRef(self.functions.len() - 1)
    }

    #[inline(always)]
    pub fn function(&self, r: FunctionRef) -> &FunctionSignature {
        &self.functions[r.0]
    }

    #[inline(always)]
    pub fn function_mut(&mut self, r: FunctionRef) -> &mut FunctionSignature {
        &mut self.functions[r.0]
    }

    /// Deep-clones an expression tree. Every expression node of the copy is freshly
    /// allocated; referenced variables are shared with the original.
    pub fn clone_expr(&mut self, r: ExprRef) -> ExprRef {
        let (mut expr, ty) = self.expressions[r.0].clone();
        expr.relocate_operands(|x| *x = self.clone_expr(*x));

        self.add_expr(expr, ty)
    }

    /// Collects every variable a statement list refers to, either by declaring it or
    /// by dereferencing it. Function definitions contribute their parameters and bodies.
    pub fn referenced_variables(&self, list: &[StmtRef]) -> HashSet<VarRef> {
        let mut sink = HashSet::new();
        self.collect_statement_variables(list, &mut sink);

        sink
    }

    fn collect_statement_variables(&self, list: &[StmtRef], sink: &mut HashSet<VarRef>) {
        for &s in list {
            match self.statement(s) {
                &Stmt::Declare(v) => {
                    sink.insert(v);
                }
                &Stmt::FunctionDefinition(f) => {
                    let f = self.function(f);
                    sink.extend(f.parameters.iter().copied());
                    self.collect_statement_variables(&f.body, sink);
                }
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    self.collect_statement_variables(then_body, sink);
                    self.collect_statement_variables(else_body, sink);
                }
                Stmt::Loop(body) => self.collect_statement_variables(body, sink),
                _ => (),
            }

            self.statement(s)
                .for_each_expr(|e| self.collect_expr_variables(e, sink));
        }
    }

    fn collect_expr_variables(&self, e: ExprRef, sink: &mut HashSet<VarRef>) {
        if let &Expr::VarDeref(v) = self.expr(e) {
            sink.insert(v);
        }

        for x in self.expr(e).operands() {
            self.collect_expr_variables(x, sink);
        }
    }
}

#[derive(Debug)]
pub struct Shader<'a> {
    pub stage: ShaderModel,
    pub arena: IrArena,
    pub instructions: Vec<StmtRef>,
    pub symbols: &'a SymbolScope<'a>,
}
impl<'a> Shader<'a> {
    pub fn new(stage: ShaderModel, symbols: &'a SymbolScope<'a>) -> Self {
        Self {
            stage,
            arena: IrArena::new(),
            instructions: Vec::new(),
            symbols,
        }
    }

    pub fn dump(&self, writer: &mut (impl std::io::Write + ?Sized)) -> std::io::Result<()> {
        block::dump_statements(writer, &self.arena, &self.instructions, 0)
    }

    pub fn dump_to_string(&self) -> std::io::Result<String> {
        let mut sink = Vec::new();
        self.dump(&mut sink)?;

        String::from_utf8(sink)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
