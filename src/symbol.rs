use meta::{Precision, SymbolAttribute, VariableMode};

use crate::{
    concrete_type::ConcreteType,
    ir::{expr::Const, StmtRef, VarRef},
};

pub mod meta;

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: ConcreteType,
    pub attribute: SymbolAttribute,
    /// Value of a read-only variable with a constant initializer.
    pub constant_value: Option<Const>,
}
impl Variable {
    pub fn new(name: impl Into<String>, ty: impl Into<ConcreteType>, mode: VariableMode) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            attribute: SymbolAttribute::with_mode(mode),
            constant_value: None,
        }
    }

    pub fn temporary(
        name: impl Into<String>,
        ty: impl Into<ConcreteType>,
        precision: Precision,
    ) -> Self {
        let mut v = Self::new(name, ty, VariableMode::Temporary);
        v.attribute.precision = precision;
        v
    }
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<VarRef>,
    pub return_type: ConcreteType,
    pub body: Vec<StmtRef>,
}
