use crate::{
    concrete_type::{ConcreteType, IntrinsicType},
    ir::{
        block::{Stmt, WriteMask},
        expr::{Const, Expr, IntrinsicBinaryOperation},
        opt::{
            lower_clip_distance, optimize, packed_length, CLIP_DISTANCE_NAME,
            PACKED_CLIP_DISTANCE_NAME,
        },
        ExprRef, IrArena, Shader, StmtRef, VarRef,
    },
    options::CompilerOptions,
    sample::{self, Scenario},
    scope::{ScopeArena, SymbolScope},
    symbol::{
        meta::{Interpolation, Precision, ShaderModel, VariableMode, VariableQualifiers},
        Variable,
    },
};

fn declare(shader: &mut Shader, var: Variable) -> VarRef {
    let (v, decl) = shader.arena.declare_variable(var);
    shader.instructions.push(decl);
    v
}

fn clip_distance(n: usize, mode: VariableMode) -> Variable {
    Variable::new(
        CLIP_DISTANCE_NAME,
        ConcreteType::array_of(IntrinsicType::Float, n),
        mode,
    )
}

fn main_body(shader: &Shader) -> Vec<StmtRef> {
    match shader.instructions.last().map(|&s| shader.arena.statement(s)) {
        Some(&Stmt::FunctionDefinition(f)) => shader.arena.function(f).body.clone(),
        _ => panic!("shader does not end with a function definition"),
    }
}

fn packed_declarations(shader: &Shader) -> Vec<VarRef> {
    shader
        .instructions
        .iter()
        .filter_map(|&s| match shader.arena.statement(s) {
            &Stmt::Declare(v) if shader.arena.variable(v).name == PACKED_CLIP_DISTANCE_NAME => {
                Some(v)
            }
            _ => None,
        })
        .collect()
}

fn assignment(arena: &IrArena, s: StmtRef) -> (ExprRef, ExprRef, Option<ExprRef>, WriteMask) {
    match *arena.statement(s) {
        Stmt::Assign {
            lhs,
            rhs,
            condition,
            write_mask,
        } => (lhs, rhs, condition, write_mask),
        ref x => panic!("expected an assignment, got {x:?}"),
    }
}

fn const_sint(arena: &IrArena, e: ExprRef) -> i32 {
    match arena.expr(e) {
        &Expr::Const(Const::SInt(v)) => v,
        x => panic!("expected an int constant, got {x:?}"),
    }
}

/// Decomposes `extract(source[block], lane)` with constant indices.
fn constant_extract(arena: &IrArena, e: ExprRef) -> (ExprRef, i32, i32) {
    let &Expr::IntrinsicBinaryOp(vector, IntrinsicBinaryOperation::VectorExtract, lane) =
        arena.expr(e)
    else {
        panic!("expected an extract, got {}", arena.display_expr(e));
    };
    let &Expr::ArrayRef { source, index } = arena.expr(vector) else {
        panic!("expected an indexed vector, got {}", arena.display_expr(vector));
    };
    assert!(arena.expr_type(vector).is_intrinsic(IntrinsicType::Float4));

    (source, const_sint(arena, index), const_sint(arena, lane))
}

#[test]
fn packed_length_rounds_up_to_whole_vectors() {
    for (n, expected) in [(1, 1), (4, 1), (5, 2), (8, 2), (13, 4)] {
        assert_eq!(packed_length(n), expected, "N={n}");
    }
}

#[test]
fn constant_index_reads_select_block_and_lane() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(8, VariableMode::ShaderOut));
    let x = declare(
        &mut shader,
        Variable::new("x", IntrinsicType::Float, VariableMode::Auto),
    );
    for i in 0..8 {
        let a = &mut shader.arena;
        let source = a.var_deref(clip);
        let index = a.const_sint(i);
        let element = a.array_ref(source, index);
        let dest = a.var_deref(x);
        let s = a.assign(dest, element);
        shader.instructions.push(s);
    }

    assert!(lower_clip_distance(&mut shader));

    let packed = packed_declarations(&shader);
    assert_eq!(packed.len(), 1);
    let reads = &shader.instructions[2..];
    assert_eq!(reads.len(), 8);
    for (i, &s) in reads.iter().enumerate() {
        let (_, rhs, _, _) = assignment(&shader.arena, s);
        let (source, block, lane) = constant_extract(&shader.arena, rhs);
        assert_eq!(*shader.arena.expr(source), Expr::VarDeref(packed[0]));
        assert_eq!((block, lane), (i as i32 / 4, i as i32 % 4));
    }

    let (_, fifth, _, _) = assignment(&shader.arena, reads[5]);
    assert_eq!(
        shader.arena.display_expr(fifth).to_string(),
        "extract(gl_ClipDistanceMESA[1], 1)"
    );
}

#[test]
fn read_only_constant_index_needs_no_temporary() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(8, VariableMode::ShaderOut));
    let mut plane = Variable::new("plane", IntrinsicType::SInt, VariableMode::Auto);
    plane.attribute.qualifiers = VariableQualifiers::READ_ONLY;
    plane.constant_value = Some(Const::SInt(5));
    let plane = declare(&mut shader, plane);
    let x = declare(
        &mut shader,
        Variable::new("x", IntrinsicType::Float, VariableMode::Auto),
    );
    let a = &mut shader.arena;
    let source = a.var_deref(clip);
    let index = a.var_deref(plane);
    let element = a.array_ref(source, index);
    let zero = a.const_float(0.0);
    let clamped = a.pure_intrinsic_call("max", vec![element, zero], IntrinsicType::Float);
    let dest = a.var_deref(x);
    let s = a.assign(dest, clamped);
    shader.instructions.push(s);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(shader.instructions.len(), 4);
    assert!(shader
        .dump_to_string().unwrap()
        .ends_with("x = max(extract(gl_ClipDistanceMESA[1], 1), 0.0);\n"));
}

#[test]
fn unsigned_constant_index_is_converted_and_folded() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::ConstantAccess,
        ShaderModel::FragmentShader,
        8,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "in (array vec4 2) gl_ClipDistanceMESA;
out float distance;
void main() {
  distance = (extract(gl_ClipDistanceMESA[0], 0) + extract(gl_ClipDistanceMESA[1], 3));
}
"
    );
}

#[test]
fn constant_writes_become_vector_stores() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::ConstantAccess,
        ShaderModel::VertexShader,
        6,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 2) gl_ClipDistanceMESA;
void main() {
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], 0.5, 0);
  gl_ClipDistanceMESA[1] = insert(gl_ClipDistanceMESA[1], -(extract(gl_ClipDistanceMESA[0], 0)), 1);
}
"
    );
    for s in main_body(&shader) {
        let (lhs, _, _, write_mask) = assignment(&shader.arena, s);
        assert_eq!(write_mask, WriteMask::XYZW);
        assert!(shader.arena.expr_type(lhs).is_intrinsic(IntrinsicType::Float4));
    }
}

#[test]
fn second_run_reports_unchanged() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(Scenario::BulkCopy, ShaderModel::VertexShader, 8, symbols);

    assert!(lower_clip_distance(&mut shader));
    let lowered = shader.dump_to_string().unwrap();
    assert!(!lower_clip_distance(&mut shader));
    assert_eq!(shader.dump_to_string().unwrap(), lowered);
}

#[test]
fn bulk_copy_unrolls_in_ascending_order() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(Scenario::BulkCopy, ShaderModel::VertexShader, 5, symbols);
    let original = main_body(&shader)[0];

    assert!(lower_clip_distance(&mut shader));

    let body = main_body(&shader);
    assert_eq!(body.len(), 5);
    assert!(!body.contains(&original));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 2) gl_ClipDistanceMESA;
uniform (array float 5) planes;
void main() {
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], planes[0], 0);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], planes[1], 1);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], planes[2], 2);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], planes[3], 3);
  gl_ClipDistanceMESA[1] = insert(gl_ClipDistanceMESA[1], planes[4], 0);
}
"
    );
}

#[test]
fn bulk_copy_out_of_input_reads_each_lane() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(Scenario::BulkCopy, ShaderModel::FragmentShader, 6, symbols);

    assert!(lower_clip_distance(&mut shader));

    let packed = packed_declarations(&shader)[0];
    let body = main_body(&shader);
    assert_eq!(body.len(), 6);
    for (i, &s) in body.iter().enumerate() {
        let (lhs, rhs, _, write_mask) = assignment(&shader.arena, s);
        assert_eq!(
            shader.arena.display_expr(lhs).to_string(),
            format!("planes[{i}]")
        );
        assert_eq!(write_mask, WriteMask::X);
        let (source, block, lane) = constant_extract(&shader.arena, rhs);
        assert_eq!(*shader.arena.expr(source), Expr::VarDeref(packed));
        assert_eq!((block, lane), (i as i32 / 4, i as i32 % 4));
    }
}

#[test]
fn conditional_bulk_copy_keeps_condition_on_each_element() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(2, VariableMode::ShaderOut));
    let planes = declare(
        &mut shader,
        Variable::new(
            "planes",
            ConcreteType::array_of(IntrinsicType::Float, 2),
            VariableMode::Uniform,
        ),
    );
    let enabled = declare(
        &mut shader,
        Variable::new("enabled", IntrinsicType::Bool, VariableMode::Uniform),
    );
    let a = &mut shader.arena;
    let dest = a.var_deref(clip);
    let source = a.var_deref(planes);
    let condition = a.var_deref(enabled);
    let copy = a.assign_if(dest, source, Some(condition));
    shader.instructions.push(copy);

    assert!(lower_clip_distance(&mut shader));

    let unrolled = &shader.instructions[3..];
    assert_eq!(unrolled.len(), 2);
    for &s in unrolled {
        let (_, _, c, _) = assignment(&shader.arena, s);
        let c = c.expect("condition dropped");
        assert_ne!(c, condition);
        assert_eq!(*shader.arena.expr(c), Expr::VarDeref(enabled));
    }
    assert!(shader
        .dump_to_string().unwrap()
        .ends_with("if (enabled) gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], planes[1], 1);\n"));
}

#[test]
fn dynamic_write_captures_index_once() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(Scenario::DynamicIndex, ShaderModel::VertexShader, 8, symbols);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 2) gl_ClipDistanceMESA;
uniform uint plane;
uniform float value;
void main() {
  temporary int clip_distance_index;
  clip_distance_index = int((plane + 1u));
  gl_ClipDistanceMESA[(clip_distance_index >> 2)] = insert(gl_ClipDistanceMESA[(clip_distance_index >> 2)], value, (clip_distance_index & 3));
}
"
    );

    let body = main_body(&shader);
    let Stmt::Declare(index) = *shader.arena.statement(body[0]) else {
        panic!("index temporary is not declared first");
    };
    let index = shader.arena.variable(index);
    assert_eq!(index.attribute.mode, VariableMode::Temporary);
    assert_eq!(index.attribute.precision, Precision::Undefined);
    assert!(index.ty.is_intrinsic(IntrinsicType::SInt));

    let (lhs, _, _, write_mask) = assignment(&shader.arena, body[2]);
    assert!(matches!(shader.arena.expr(lhs), Expr::ArrayRef { .. }));
    assert_eq!(write_mask, WriteMask::XYZW);
}

#[test]
fn dynamic_read_in_nested_control_flow_stays_in_its_block() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::FragmentShader, symbols);
    let clip = declare(&mut shader, clip_distance(4, VariableMode::ShaderIn));
    let i = declare(
        &mut shader,
        Variable::new("i", IntrinsicType::SInt, VariableMode::Uniform),
    );
    let a = &mut shader.arena;
    let source = a.var_deref(clip);
    let index = a.var_deref(i);
    let element = a.array_ref(source, index);
    let zero = a.const_float(0.0);
    let negative = a.binary(element, IntrinsicBinaryOperation::Lt, zero);
    let discard = a.add_statement(Stmt::Discard(Some(negative)));
    let exit = a.add_statement(Stmt::Break);
    let flag = a.const_bool(true);
    let branch = a.add_statement(Stmt::If {
        condition: flag,
        then_body: vec![discard],
        else_body: vec![exit],
    });
    let looped = a.add_statement(Stmt::Loop(vec![branch]));
    shader.instructions.push(looped);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "in (array vec4 1) gl_ClipDistanceMESA;
uniform int i;
loop {
  if (true) {
    temporary int clip_distance_index;
    clip_distance_index = i;
    discard if ((extract(gl_ClipDistanceMESA[(clip_distance_index >> 2)], (clip_distance_index & 3)) < 0.0));
  } else {
    break;
  }
}
"
    );
}

#[test]
fn inout_argument_is_copied_in_and_out() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::Call(VariableMode::FunctionInOut),
        ShaderModel::VertexShader,
        4,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 1) gl_ClipDistanceMESA;
void compute_distances(inout (array float 4) distances) {
  distances[0] = 1.0;
}
void main() {
  temporary (array float 4) temp_clip_distance;
  temp_clip_distance[0] = extract(gl_ClipDistanceMESA[0], 0);
  temp_clip_distance[1] = extract(gl_ClipDistanceMESA[0], 1);
  temp_clip_distance[2] = extract(gl_ClipDistanceMESA[0], 2);
  temp_clip_distance[3] = extract(gl_ClipDistanceMESA[0], 3);
  compute_distances(temp_clip_distance);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], temp_clip_distance[0], 0);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], temp_clip_distance[1], 1);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], temp_clip_distance[2], 2);
  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], temp_clip_distance[3], 3);
}
"
    );

    let body = main_body(&shader);
    let Stmt::Declare(temp) = *shader.arena.statement(body[0]) else {
        panic!("argument temporary is not declared first");
    };
    assert_eq!(
        shader.arena.variable(temp).attribute.precision,
        Precision::High
    );
}

/// Kinds of the statements of `main`: `d`eclaration, `a`ssignment, `c`all.
fn body_shape(shader: &Shader) -> String {
    main_body(shader)
        .into_iter()
        .map(|s| match shader.arena.statement(s) {
            Stmt::Declare(_) => 'd',
            Stmt::Assign { .. } => 'a',
            Stmt::Call { .. } => 'c',
            x => panic!("unexpected statement {x:?}"),
        })
        .collect()
}

#[test]
fn in_argument_is_only_copied_in() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::Call(VariableMode::FunctionIn),
        ShaderModel::VertexShader,
        3,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(body_shape(&shader), "daaac");
}

#[test]
fn const_in_argument_is_only_copied_in() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::Call(VariableMode::ConstIn),
        ShaderModel::VertexShader,
        2,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(body_shape(&shader), "daac");
}

#[test]
fn out_argument_is_only_copied_out() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::Call(VariableMode::FunctionOut),
        ShaderModel::VertexShader,
        3,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(body_shape(&shader), "dcaaa");

    let body = main_body(&shader);
    let Stmt::Call { ref args, .. } = *shader.arena.statement(body[1]) else {
        unreachable!();
    };
    let Stmt::Declare(temp) = *shader.arena.statement(body[0]) else {
        unreachable!();
    };
    assert_eq!(*shader.arena.expr(args[0]), Expr::VarDeref(temp));
}

#[test]
fn copy_outs_of_later_arguments_come_first() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(1, VariableMode::ShaderOut));
    let a = &mut shader.arena;
    let array_ty = ConcreteType::array_of(IntrinsicType::Float, 1);
    let p0 = a.add_variable(Variable::new(
        "first",
        array_ty.clone(),
        VariableMode::FunctionOut,
    ));
    let p1 = a.add_variable(Variable::new("second", array_ty, VariableMode::FunctionOut));
    let callee = a.void_function("fill", vec![p0, p1]);
    let arg0 = a.var_deref(clip);
    let arg1 = a.var_deref(clip);
    let call = a.call(callee, vec![arg0, arg1], None);
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));

    // decl t0, decl t1, call, copy-out t1, copy-out t0
    let tail = &shader.instructions[1..];
    assert_eq!(tail.len(), 5);
    let Stmt::Call { ref args, .. } = *shader.arena.statement(tail[2]) else {
        panic!("call is not in the middle");
    };
    let temps = args
        .iter()
        .map(|&a| match *shader.arena.expr(a) {
            Expr::VarDeref(v) => v,
            ref x => panic!("argument not materialized: {x:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(*shader.arena.statement(tail[0]), Stmt::Declare(temps[0]));
    assert_eq!(*shader.arena.statement(tail[1]), Stmt::Declare(temps[1]));
    for (&s, &temp) in tail[3..].iter().zip([temps[1], temps[0]].iter()) {
        let (_, rhs, _, _) = assignment(&shader.arena, s);
        let Expr::CompositeInsert { value, .. } = *shader.arena.expr(rhs) else {
            panic!("copy-out is not a vector store");
        };
        let &Expr::ArrayRef { source, .. } = shader.arena.expr(value) else {
            panic!("copy-out does not read the temporary");
        };
        assert_eq!(*shader.arena.expr(source), Expr::VarDeref(temp));
    }
}

#[test]
fn call_result_into_element_goes_through_temporary() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(4, VariableMode::ShaderOut));
    let a = &mut shader.arena;
    let (callee, def) = a.define_function(
        "distance_to_plane",
        Vec::new(),
        IntrinsicType::Float,
        Vec::new(),
    );
    let dest = a.var_deref(clip);
    let two = a.const_sint(2);
    let dest = a.array_ref(dest, two);
    let call = a.call(callee, Vec::new(), Some(dest));
    shader.instructions.extend([def, call]);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 1) gl_ClipDistanceMESA;
float distance_to_plane() {
}
temporary float clip_distance_result;
clip_distance_result = distance_to_plane();
gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], clip_distance_result, 2);
"
    );
}

#[test]
fn geometry_input_slice_copies_like_a_flat_array() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::GeometryShader, symbols);
    let input = declare(
        &mut shader,
        Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float, 5), 3),
            VariableMode::ShaderIn,
        ),
    );
    let dest = declare(
        &mut shader,
        Variable::new(
            "dest",
            ConcreteType::array_of(IntrinsicType::Float, 5),
            VariableMode::Auto,
        ),
    );
    let a = &mut shader.arena;
    let lhs = a.var_deref(dest);
    let source = a.var_deref(input);
    let vertex = a.const_sint(2);
    let rhs = a.array_ref(source, vertex);
    let copy = a.assign(lhs, rhs);
    shader.instructions.push(copy);

    assert!(lower_clip_distance(&mut shader));

    let packed = packed_declarations(&shader);
    assert_eq!(packed.len(), 1);
    assert_eq!(
        shader.arena.variable(packed[0]).ty,
        ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float4, 2), 3)
    );
    let unrolled = &shader.instructions[2..];
    assert_eq!(unrolled.len(), 5);
    for (i, &s) in unrolled.iter().enumerate() {
        let (lhs, rhs, _, _) = assignment(&shader.arena, s);
        assert_eq!(
            shader.arena.display_expr(lhs).to_string(),
            format!("dest[{i}]")
        );
        let (slice, block, lane) = constant_extract(&shader.arena, rhs);
        let &Expr::ArrayRef { source, index } = shader.arena.expr(slice) else {
            panic!("element does not come from a vertex slice");
        };
        assert_eq!(*shader.arena.expr(source), Expr::VarDeref(packed[0]));
        assert_eq!(const_sint(&shader.arena, index), 2);
        assert_eq!((block, lane), (i as i32 / 4, i as i32 % 4));
    }
}

#[test]
fn geometry_passthrough_registers_first_packed_variable() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(
        Scenario::GeometryPassthrough,
        ShaderModel::GeometryShader,
        4,
        symbols,
    );

    assert!(lower_clip_distance(&mut shader));

    let packed = packed_declarations(&shader);
    assert_eq!(packed.len(), 2);
    let (input, output): (Vec<_>, Vec<_>) = packed
        .iter()
        .copied()
        .partition(|&v| shader.arena.variable(v).attribute.mode == VariableMode::ShaderIn);
    assert_eq!(
        symbols.lookup_variable(PACKED_CLIP_DISTANCE_NAME),
        Some(output[0])
    );
    assert_eq!(
        shader.arena.variable(input[0]).ty,
        ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float4, 1), 3)
    );

    let body = main_body(&shader);
    // 4 element stores and one EmitVertex per input vertex
    assert_eq!(body.len(), 3 * 5);
    assert!(shader.dump_to_string().unwrap().contains(
        "  gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], extract(gl_ClipDistanceMESA[1][0], 3), 3);\n  EmitVertex();\n"
    ));
}

#[test]
fn packed_variable_inherits_attributes() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::TessellationEvaluationShader, symbols);
    let mut var = clip_distance(7, VariableMode::ShaderOut);
    var.attribute.precision = Precision::Medium;
    var.attribute.interpolation = Interpolation::NoPerspective;
    var.attribute.qualifiers = VariableQualifiers::INVARIANT | VariableQualifiers::PRECISE;
    var.attribute.location = Some(3);
    var.attribute.max_array_access = 6;
    let old = declare(&mut shader, var);

    assert!(lower_clip_distance(&mut shader));

    let packed = packed_declarations(&shader)[0];
    let old = shader.arena.variable(old);
    let new = shader.arena.variable(packed);
    assert_eq!(new.ty, ConcreteType::array_of(IntrinsicType::Float4, 2));
    assert_eq!(new.attribute.mode, old.attribute.mode);
    assert_eq!(new.attribute.precision, Precision::Medium);
    assert_eq!(new.attribute.interpolation, Interpolation::NoPerspective);
    assert_eq!(new.attribute.qualifiers, old.attribute.qualifiers);
    assert_eq!(new.attribute.location, Some(3));
    assert_eq!(new.attribute.max_array_access, 1);
    assert_eq!(symbols.lookup_variable(PACKED_CLIP_DISTANCE_NAME), Some(packed));
}

#[test]
fn second_declaration_of_captured_shape_is_left_alone() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    declare(&mut shader, clip_distance(8, VariableMode::ShaderOut));
    let second = declare(&mut shader, clip_distance(8, VariableMode::ShaderOut));

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 2) gl_ClipDistanceMESA;
out (array float 8) gl_ClipDistance;
"
    );
    assert_eq!(shader.arena.statement(shader.instructions[1]), &Stmt::Declare(second));
}

#[test]
fn no_reference_to_logical_array_survives() {
    let calls = [
        VariableMode::FunctionIn,
        VariableMode::FunctionOut,
        VariableMode::FunctionInOut,
    ]
    .map(Scenario::Call);
    let scenarios = [
        Scenario::ConstantAccess,
        Scenario::DynamicIndex,
        Scenario::BulkCopy,
    ]
    .into_iter()
    .chain(calls);
    let stages = [
        ShaderModel::VertexShader,
        ShaderModel::TessellationControlShader,
        ShaderModel::GeometryShader,
        ShaderModel::FragmentShader,
    ];

    let cases = scenarios
        .flat_map(|sc| stages.map(|st| (sc, st)))
        .chain([(Scenario::GeometryPassthrough, ShaderModel::GeometryShader)]);
    for (scenario, stage) in cases {
        for n in [1, 4, 6] {
            let scopes = ScopeArena::new();
            let symbols = SymbolScope::new_toplevel(&scopes);
            let mut shader = sample::build(scenario, stage, n, symbols);

            assert!(lower_clip_distance(&mut shader), "{scenario:?} {stage:?} N={n}");
            for v in shader.arena.referenced_variables(&shader.instructions) {
                assert_ne!(
                    shader.arena.variable(v).name,
                    CLIP_DISTANCE_NAME,
                    "{scenario:?} {stage:?} N={n}:\n{}",
                    shader.dump_to_string().unwrap()
                );
            }
        }
    }
}

#[test]
fn shader_without_clip_distance_is_unchanged() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let position = declare(
        &mut shader,
        Variable::new(
            "gl_Position",
            IntrinsicType::Float4,
            VariableMode::ShaderOut,
        ),
    );
    let a = &mut shader.arena;
    let dest = a.var_deref(position);
    let one = a.const_float(1.0);
    let s = a.assign(dest, one);
    shader.instructions.push(s);
    let before = shader.dump_to_string().unwrap();

    assert!(!lower_clip_distance(&mut shader));
    assert_eq!(shader.dump_to_string().unwrap(), before);
    assert_eq!(symbols.lookup_variable(PACKED_CLIP_DISTANCE_NAME), None);
}

#[test]
fn optimize_respects_options() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = sample::build(Scenario::BulkCopy, ShaderModel::VertexShader, 8, symbols);
    let before = shader.dump_to_string().unwrap();

    let disabled = CompilerOptions {
        lower_clip_distance: false,
    };
    assert!(!optimize(&mut shader, &disabled));
    assert_eq!(shader.dump_to_string().unwrap(), before);

    assert!(optimize(&mut shader, &CompilerOptions::default()));
    assert_ne!(shader.dump_to_string().unwrap(), before);
}

#[test]
#[should_panic(expected = "only valid as a geometry shader input")]
fn two_dimensional_outside_geometry_stage_panics() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    declare(
        &mut shader,
        Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float, 4), 3),
            VariableMode::ShaderIn,
        ),
    );

    lower_clip_distance(&mut shader);
}

#[test]
#[should_panic(expected = "only valid as a geometry shader input")]
fn two_dimensional_output_panics() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::GeometryShader, symbols);
    declare(
        &mut shader,
        Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float, 4), 3),
            VariableMode::ShaderOut,
        ),
    );

    lower_clip_distance(&mut shader);
}

#[test]
#[should_panic(expected = "must be an array of float")]
fn non_float_elements_panic() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    declare(
        &mut shader,
        Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(IntrinsicType::SInt, 4),
            VariableMode::ShaderOut,
        ),
    );

    lower_clip_distance(&mut shader);
}

#[test]
#[should_panic(expected = "must be declared as an array")]
fn scalar_declaration_panics() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    declare(
        &mut shader,
        Variable::new(CLIP_DISTANCE_NAME, IntrinsicType::Float, VariableMode::ShaderOut),
    );

    lower_clip_distance(&mut shader);
}

fn geometry_input(shader: &mut Shader, n: usize) -> VarRef {
    declare(
        shader,
        Variable::new(
            CLIP_DISTANCE_NAME,
            ConcreteType::array_of(ConcreteType::array_of(IntrinsicType::Float, n), 3),
            VariableMode::ShaderIn,
        ),
    )
}

#[test]
fn element_bound_to_out_parameter_is_stored_back() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(4, VariableMode::ShaderOut));
    let a = &mut shader.arena;
    let d = a.add_variable(Variable::new("d", IntrinsicType::Float, VariableMode::FunctionOut));
    let callee = a.void_function("write_one", vec![d]);
    let source = a.var_deref(clip);
    let two = a.const_sint(2);
    let element = a.array_ref(source, two);
    let call = a.call(callee, vec![element], None);
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 1) gl_ClipDistanceMESA;
temporary float temp_clip_distance;
write_one(temp_clip_distance);
gl_ClipDistanceMESA[0] = insert(gl_ClipDistanceMESA[0], temp_clip_distance, 2);
"
    );
    let Stmt::Call { ref args, .. } = *shader.arena.statement(shader.instructions[2]) else {
        panic!("call moved");
    };
    assert!(shader.arena.expr(args[0]).is_lvalue());
}

#[test]
fn element_bound_to_inout_parameter_captures_index_before_call() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(4, VariableMode::ShaderOut));
    let i = declare(
        &mut shader,
        Variable::new("i", IntrinsicType::SInt, VariableMode::Uniform),
    );
    let a = &mut shader.arena;
    let d = a.add_variable(Variable::new(
        "d",
        IntrinsicType::Float,
        VariableMode::FunctionInOut,
    ));
    let callee = a.void_function("adjust", vec![d]);
    let source = a.var_deref(clip);
    let index = a.var_deref(i);
    let element = a.array_ref(source, index);
    let call = a.call(callee, vec![element], None);
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 1) gl_ClipDistanceMESA;
uniform int i;
temporary float temp_clip_distance;
temporary int clip_distance_index;
clip_distance_index = i;
temp_clip_distance = extract(gl_ClipDistanceMESA[(clip_distance_index >> 2)], (clip_distance_index & 3));
adjust(temp_clip_distance);
gl_ClipDistanceMESA[(clip_distance_index >> 2)] = insert(gl_ClipDistanceMESA[(clip_distance_index >> 2)], temp_clip_distance, (clip_distance_index & 3));
"
    );
}

#[test]
fn element_bound_to_in_parameter_is_read_in_place() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::FragmentShader, symbols);
    let clip = declare(&mut shader, clip_distance(4, VariableMode::ShaderIn));
    let a = &mut shader.arena;
    let d = a.add_variable(Variable::new("d", IntrinsicType::Float, VariableMode::FunctionIn));
    let callee = a.void_function("consume", vec![d]);
    let source = a.var_deref(clip);
    let three = a.const_sint(3);
    let element = a.array_ref(source, three);
    let call = a.call(callee, vec![element], None);
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "in (array vec4 1) gl_ClipDistanceMESA;
consume(extract(gl_ClipDistanceMESA[0], 3));
"
    );
}

#[test]
fn call_result_with_dynamic_index_captures_index_before_call() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::VertexShader, symbols);
    let clip = declare(&mut shader, clip_distance(8, VariableMode::ShaderOut));
    let i = declare(
        &mut shader,
        Variable::new("i", IntrinsicType::SInt, VariableMode::Auto),
    );
    let a = &mut shader.arena;
    let (callee, _) = a.define_function(
        "next_plane",
        Vec::new(),
        IntrinsicType::Float,
        Vec::new(),
    );
    let dest = a.var_deref(clip);
    let index = a.var_deref(i);
    let dest = a.array_ref(dest, index);
    let call = a.call(callee, Vec::new(), Some(dest));
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "out (array vec4 2) gl_ClipDistanceMESA;
int i;
temporary float clip_distance_result;
temporary int clip_distance_index;
clip_distance_index = i;
clip_distance_result = next_plane();
gl_ClipDistanceMESA[(clip_distance_index >> 2)] = insert(gl_ClipDistanceMESA[(clip_distance_index >> 2)], clip_distance_result, (clip_distance_index & 3));
"
    );
}

#[test]
fn geometry_input_element_with_dynamic_index() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::GeometryShader, symbols);
    let input = geometry_input(&mut shader, 8);
    let j = declare(
        &mut shader,
        Variable::new("j", IntrinsicType::SInt, VariableMode::Uniform),
    );
    let x = declare(
        &mut shader,
        Variable::new("x", IntrinsicType::Float, VariableMode::Auto),
    );
    let a = &mut shader.arena;
    let source = a.var_deref(input);
    let vertex = a.const_sint(1);
    let slice = a.array_ref(source, vertex);
    let index = a.var_deref(j);
    let element = a.array_ref(slice, index);
    let dest = a.var_deref(x);
    let read = a.assign(dest, element);
    shader.instructions.push(read);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "in (array (array vec4 2) 3) gl_ClipDistanceMESA;
uniform int j;
float x;
temporary int clip_distance_index;
clip_distance_index = j;
x = extract(gl_ClipDistanceMESA[1][(clip_distance_index >> 2)], (clip_distance_index & 3));
"
    );
}

#[test]
fn geometry_input_slice_passed_to_in_parameter() {
    let scopes = ScopeArena::new();
    let symbols = SymbolScope::new_toplevel(&scopes);
    let mut shader = Shader::new(ShaderModel::GeometryShader, symbols);
    let input = geometry_input(&mut shader, 5);
    let a = &mut shader.arena;
    let d = a.add_variable(Variable::new(
        "d",
        ConcreteType::array_of(IntrinsicType::Float, 5),
        VariableMode::FunctionIn,
    ));
    let callee = a.void_function("consume", vec![d]);
    let source = a.var_deref(input);
    let vertex = a.const_sint(2);
    let slice = a.array_ref(source, vertex);
    let call = a.call(callee, vec![slice], None);
    shader.instructions.push(call);

    assert!(lower_clip_distance(&mut shader));
    assert_eq!(
        shader.dump_to_string().unwrap(),
        "in (array (array vec4 2) 3) gl_ClipDistanceMESA;
temporary (array float 5) temp_clip_distance;
temp_clip_distance[0] = extract(gl_ClipDistanceMESA[2][0], 0);
temp_clip_distance[1] = extract(gl_ClipDistanceMESA[2][0], 1);
temp_clip_distance[2] = extract(gl_ClipDistanceMESA[2][0], 2);
temp_clip_distance[3] = extract(gl_ClipDistanceMESA[2][0], 3);
temp_clip_distance[4] = extract(gl_ClipDistanceMESA[2][1], 0);
consume(temp_clip_distance);
"
    );
}
