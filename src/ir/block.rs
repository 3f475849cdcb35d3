use crate::{
    concrete_type::ConcreteType,
    utils::{CommaSeparatedWriter, IndentWriter},
};

use super::{ExprRef, FunctionRef, IrArena, StmtRef, VarRef};

bitflags::bitflags! {
    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct WriteMask : u8 {
        const X = 0x01;
        const Y = 0x02;
        const Z = 0x04;
        const W = 0x08;
        const XYZW = 0x0f;
    }
}
impl WriteMask {
    /// Mask covering every component of a value of type `ty`. Non-vector values are
    /// written as a whole.
    pub fn for_type(ty: &ConcreteType) -> Self {
        match ty.as_intrinsic().map(|t| t.vector_elements()) {
            Some(2) => Self::X | Self::Y,
            Some(3) => Self::X | Self::Y | Self::Z,
            Some(4) => Self::XYZW,
            _ => Self::X,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declare(VarRef),
    FunctionDefinition(FunctionRef),
    Assign {
        lhs: ExprRef,
        rhs: ExprRef,
        condition: Option<ExprRef>,
        write_mask: WriteMask,
    },
    Call {
        callee: FunctionRef,
        args: Vec<ExprRef>,
        result: Option<ExprRef>,
    },
    If {
        condition: ExprRef,
        then_body: Vec<StmtRef>,
        else_body: Vec<StmtRef>,
    },
    Loop(Vec<StmtRef>),
    Break,
    Continue,
    Return(Option<ExprRef>),
    Discard(Option<ExprRef>),
    EmitVertex,
}
impl Stmt {
    /// Visits the expressions owned directly by this statement (not those of nested
    /// statement lists).
    pub fn for_each_expr(&self, mut f: impl FnMut(ExprRef)) {
        match self {
            &Self::Assign {
                lhs,
                rhs,
                condition,
                ..
            } => {
                f(lhs);
                f(rhs);
                if let Some(c) = condition {
                    f(c);
                }
            }
            Self::Call { args, result, .. } => {
                args.iter().copied().for_each(&mut f);
                if let &Some(r) = result {
                    f(r);
                }
            }
            &Self::If { condition, .. } => f(condition),
            &Self::Return(Some(x)) | &Self::Discard(Some(x)) => f(x),
            Self::Declare(_)
            | Self::FunctionDefinition(_)
            | Self::Loop(_)
            | Self::Break
            | Self::Continue
            | Self::Return(None)
            | Self::Discard(None)
            | Self::EmitVertex => (),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorAction {
    Keep,
    Replace(StmtRef),
    Remove,
}

/// Edits queued against the statement currently being visited. The owning list
/// applies them once the visit returns, so statements around the current one keep
/// their relative order.
#[derive(Debug, Clone)]
pub struct StatementCursor {
    before: Vec<StmtRef>,
    after: Vec<StmtRef>,
    action: CursorAction,
}
impl StatementCursor {
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            action: CursorAction::Keep,
        }
    }

    #[inline]
    pub fn insert_before(&mut self, s: StmtRef) {
        self.before.push(s);
    }

    #[inline]
    pub fn insert_before_all(&mut self, xs: impl IntoIterator<Item = StmtRef>) {
        self.before.extend(xs);
    }

    /// Places `s` immediately after the current statement, ahead of anything inserted
    /// after it earlier.
    #[inline]
    pub fn insert_after(&mut self, s: StmtRef) {
        self.after.insert(0, s);
    }

    /// Places a sequence immediately after the current statement, keeping its order.
    pub fn insert_after_all(&mut self, xs: impl IntoIterator<Item = StmtRef>) {
        let rest = core::mem::take(&mut self.after);
        self.after.extend(xs);
        self.after.extend(rest);
    }

    #[inline]
    pub fn replace_with(&mut self, s: StmtRef) {
        assert_eq!(
            self.action,
            CursorAction::Keep,
            "current statement already replaced or removed"
        );
        self.action = CursorAction::Replace(s);
    }

    #[inline]
    pub fn remove(&mut self) {
        assert_eq!(
            self.action,
            CursorAction::Keep,
            "current statement already replaced or removed"
        );
        self.action = CursorAction::Remove;
    }

    pub fn splice_into(self, current: StmtRef, out: &mut Vec<StmtRef>) {
        out.extend(self.before);
        match self.action {
            CursorAction::Keep => out.push(current),
            CursorAction::Replace(s) => out.push(s),
            CursorAction::Remove => (),
        }
        out.extend(self.after);
    }
}
impl Default for StatementCursor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn dump_statements(
    writer: &mut (impl std::io::Write + ?Sized),
    arena: &IrArena,
    list: &[StmtRef],
    depth: usize,
) -> std::io::Result<()> {
    for &s in list {
        dump_statement(writer, arena, s, depth)?;
    }

    Ok(())
}

fn dump_statement(
    writer: &mut (impl std::io::Write + ?Sized),
    arena: &IrArena,
    s: StmtRef,
    depth: usize,
) -> std::io::Result<()> {
    let indent = IndentWriter(depth);
    let d = |e| arena.display_expr(e);

    match arena.statement(s) {
        &Stmt::Declare(v) => {
            let v = arena.variable(v);
            writeln!(
                writer,
                "{indent}{}{} {};",
                v.attribute.mode.keyword(),
                v.ty,
                v.name
            )
        }
        &Stmt::FunctionDefinition(f) => {
            let f = arena.function(f);
            let params = f
                .parameters
                .iter()
                .map(|&p| {
                    let p = arena.variable(p);
                    format!("{}{} {}", p.attribute.mode.keyword(), p.ty, p.name)
                })
                .collect::<Vec<_>>();
            writeln!(
                writer,
                "{indent}{} {}({}) {{",
                f.return_type,
                f.name,
                CommaSeparatedWriter(&params)
            )?;
            dump_statements(writer, arena, &f.body, depth + 1)?;
            writeln!(writer, "{indent}}}")
        }
        &Stmt::Assign {
            lhs,
            rhs,
            condition: None,
            ..
        } => writeln!(writer, "{indent}{} = {};", d(lhs), d(rhs)),
        &Stmt::Assign {
            lhs,
            rhs,
            condition: Some(c),
            ..
        } => writeln!(writer, "{indent}if ({}) {} = {};", d(c), d(lhs), d(rhs)),
        Stmt::Call {
            callee,
            args,
            result,
        } => {
            let args = args.iter().map(|&a| d(a)).collect::<Vec<_>>();
            let name = &arena.function(*callee).name;
            match result {
                &Some(r) => writeln!(
                    writer,
                    "{indent}{} = {name}({});",
                    d(r),
                    CommaSeparatedWriter(&args)
                ),
                None => writeln!(writer, "{indent}{name}({});", CommaSeparatedWriter(&args)),
            }
        }
        Stmt::If {
            condition,
            then_body,
            else_body,
        } => {
            writeln!(writer, "{indent}if ({}) {{", d(*condition))?;
            dump_statements(writer, arena, then_body, depth + 1)?;
            if !else_body.is_empty() {
                writeln!(writer, "{indent}}} else {{")?;
                dump_statements(writer, arena, else_body, depth + 1)?;
            }
            writeln!(writer, "{indent}}}")
        }
        Stmt::Loop(body) => {
            writeln!(writer, "{indent}loop {{")?;
            dump_statements(writer, arena, body, depth + 1)?;
            writeln!(writer, "{indent}}}")
        }
        Stmt::Break => writeln!(writer, "{indent}break;"),
        Stmt::Continue => writeln!(writer, "{indent}continue;"),
        Stmt::Return(None) => writeln!(writer, "{indent}return;"),
        &Stmt::Return(Some(x)) => writeln!(writer, "{indent}return {};", d(x)),
        Stmt::Discard(None) => writeln!(writer, "{indent}discard;"),
        &Stmt::Discard(Some(c)) => writeln!(writer, "{indent}discard if ({});", d(c)),
        Stmt::EmitVertex => writeln!(writer, "{indent}EmitVertex();"),
    }
}
