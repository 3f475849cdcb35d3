//! Small shaders touching `gl_ClipDistance` in each of the ways the lowering pass
//! rewrites. Used by the command-line driver and the pass tests.

use crate::{
    concrete_type::{ConcreteType, IntrinsicType},
    ir::{
        block::Stmt,
        expr::{IntrinsicBinaryOperation, IntrinsicUnaryOperation},
        opt::CLIP_DISTANCE_NAME,
        Shader, StmtRef, VarRef,
    },
    scope::SymbolScope,
    symbol::{
        meta::{Precision, ShaderModel, VariableMode},
        Variable,
    },
};

/// Vertices per input primitive of the geometry samples (triangles).
pub const GEOMETRY_INPUT_VERTICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Element accesses with constant indices.
    ConstantAccess,
    /// An element access through a runtime index.
    DynamicIndex,
    /// A whole-array assignment.
    BulkCopy,
    /// The whole array passed to a function parameter with the given mode.
    Call(VariableMode),
    /// Copies each input vertex's distances to the output. Geometry stage only.
    GeometryPassthrough,
}

/// Builds the sample shader for `scenario`. Output stages write `gl_ClipDistance`,
/// the fragment stage reads it.
pub fn build<'a>(
    scenario: Scenario,
    stage: ShaderModel,
    clip_distances: usize,
    symbols: &'a SymbolScope<'a>,
) -> Shader<'a> {
    assert!(clip_distances > 0, "at least one clip distance is required");

    let mut builder = SampleBuilder::new(stage, symbols);
    match scenario {
        Scenario::ConstantAccess => builder.constant_access(clip_distances),
        Scenario::DynamicIndex => builder.dynamic_index(clip_distances),
        Scenario::BulkCopy => builder.bulk_copy(clip_distances),
        Scenario::Call(mode) => builder.call(clip_distances, mode),
        Scenario::GeometryPassthrough => {
            assert_eq!(
                stage,
                ShaderModel::GeometryShader,
                "passthrough sample needs the geometry stage"
            );
            builder.geometry_passthrough(clip_distances)
        }
    }

    builder.shader
}

struct SampleBuilder<'a> {
    shader: Shader<'a>,
}
impl<'a> SampleBuilder<'a> {
    fn new(stage: ShaderModel, symbols: &'a SymbolScope<'a>) -> Self {
        Self {
            shader: Shader::new(stage, symbols),
        }
    }

    fn reads_clip_distance(&self) -> bool {
        self.shader.stage == ShaderModel::FragmentShader
    }

    /// Declares a global and registers it by name.
    fn global(&mut self, var: Variable) -> VarRef {
        let name = var.name.clone();
        let (v, decl) = self.shader.arena.declare_variable(var);
        self.shader.instructions.push(decl);
        self.shader.symbols.add_variable(&name, v);

        v
    }

    fn clip_distance_1d(&mut self, n: usize) -> VarRef {
        let mode = if self.reads_clip_distance() {
            VariableMode::ShaderIn
        } else {
            VariableMode::ShaderOut
        };
        let mut var = Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(IntrinsicType::Float, n),
            mode,
        );
        var.attribute.precision = Precision::High;

        self.global(var)
    }

    /// `void main() { body }`
    fn main(&mut self, body: Vec<StmtRef>) {
        let (_, def) = self
            .shader
            .arena
            .define_function("main", Vec::new(), IntrinsicType::Unit, body);
        self.shader.instructions.push(def);
    }

    fn constant_access(&mut self, n: usize) {
        let clip = self.clip_distance_1d(n);
        let mut body = Vec::new();

        if self.reads_clip_distance() {
            let out = self.global(Variable::new(
                "distance",
                IntrinsicType::Float,
                VariableMode::ShaderOut,
            ));
            let a = &mut self.shader.arena;

            let first = a.var_deref(clip);
            let first_index = a.const_sint(0);
            let first = a.array_ref(first, first_index);
            let last = a.var_deref(clip);
            let last_index = a.const_uint((n - 1) as u32);
            let last = a.array_ref(last, last_index);
            let sum = a.binary(first, IntrinsicBinaryOperation::Add, last);
            let dest = a.var_deref(out);
            body.push(a.assign(dest, sum));
        } else {
            let a = &mut self.shader.arena;

            let first = a.var_deref(clip);
            let first_index = a.const_sint(0);
            let first = a.array_ref(first, first_index);
            let half = a.const_float(0.5);
            body.push(a.assign(first, half));

            let last = a.var_deref(clip);
            let last_index = a.const_sint((n - 1) as i32);
            let last = a.array_ref(last, last_index);
            let first = a.var_deref(clip);
            let first_index = a.const_sint(0);
            let first = a.array_ref(first, first_index);
            let negated = a.unary(first, IntrinsicUnaryOperation::Neg);
            body.push(a.assign(last, negated));
        }

        self.main(body);
    }

    fn dynamic_index(&mut self, n: usize) {
        let clip = self.clip_distance_1d(n);
        let plane = self.global(Variable::new(
            "plane",
            IntrinsicType::UInt,
            VariableMode::Uniform,
        ));
        let value = if self.reads_clip_distance() {
            self.global(Variable::new(
                "distance",
                IntrinsicType::Float,
                VariableMode::ShaderOut,
            ))
        } else {
            self.global(Variable::new(
                "value",
                IntrinsicType::Float,
                VariableMode::Uniform,
            ))
        };
        let reads = self.reads_clip_distance();
        let a = &mut self.shader.arena;

        let plane = a.var_deref(plane);
        let one = a.const_uint(1);
        let index = a.binary(plane, IntrinsicBinaryOperation::Add, one);
        let clip = a.var_deref(clip);
        let element = a.array_ref(clip, index);
        let value = a.var_deref(value);
        let body = if reads {
            vec![a.assign(value, element)]
        } else {
            vec![a.assign(element, value)]
        };

        self.main(body);
    }

    fn bulk_copy(&mut self, n: usize) {
        let clip = self.clip_distance_1d(n);
        let reads = self.reads_clip_distance();
        let planes_mode = if reads {
            VariableMode::ShaderOut
        } else {
            VariableMode::Uniform
        };
        let planes = self.global(Variable::new(
            "planes",
            ConcreteType::array_of(IntrinsicType::Float, n),
            planes_mode,
        ));
        let a = &mut self.shader.arena;

        let clip = a.var_deref(clip);
        let planes = a.var_deref(planes);
        let body = if reads {
            vec![a.assign(planes, clip)]
        } else {
            vec![a.assign(clip, planes)]
        };

        self.main(body);
    }

    fn call(&mut self, n: usize, mode: VariableMode) {
        let clip = self.clip_distance_1d(n);
        let a = &mut self.shader.arena;

        let param = a.add_variable(Variable::new(
            "distances",
            ConcreteType::array_of(IntrinsicType::Float, n),
            mode,
        ));
        let mut callee_body = Vec::new();
        if mode.accepts_output() {
            let d = a.var_deref(param);
            let zero = a.const_sint(0);
            let d0 = a.array_ref(d, zero);
            let one = a.const_float(1.0);
            callee_body.push(a.assign(d0, one));
        }
        let (callee, def) = a.define_function(
            "compute_distances",
            vec![param],
            IntrinsicType::Unit,
            callee_body,
        );
        self.shader.instructions.push(def);
        self.shader
            .symbols
            .add_function("compute_distances", callee);

        let a = &mut self.shader.arena;
        let arg = a.var_deref(clip);
        let call = a.call(callee, vec![arg], None);

        self.main(vec![call]);
    }

    fn geometry_passthrough(&mut self, n: usize) {
        let mut input = Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(
                ConcreteType::array_of(IntrinsicType::Float, n),
                GEOMETRY_INPUT_VERTICES,
            ),
            VariableMode::ShaderIn,
        );
        input.attribute.precision = Precision::High;
        let (input, decl) = self.shader.arena.declare_variable(input);
        self.shader.instructions.push(decl);
        // the output of the same name shadows the input in the global scope
        let output = self.clip_distance_1d(n);

        let a = &mut self.shader.arena;
        let mut body = Vec::new();
        for vertex in 0..GEOMETRY_INPUT_VERTICES {
            let dest = a.var_deref(output);
            let source = a.var_deref(input);
            let vertex = a.const_sint(vertex as i32);
            let source = a.array_ref(source, vertex);
            body.push(a.assign(dest, source));
            body.push(a.add_statement(Stmt::EmitVertex));
        }

        self.main(body);
    }
}
