use std::io::Write;

use clap::{Parser, ValueEnum};
use lower_clip_distance::{
    ir::opt,
    options::CompilerOptions,
    sample::{self, Scenario},
    scope::{ScopeArena, SymbolScope},
    symbol::meta::{ShaderModel, VariableMode},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Stage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
}
impl From<Stage> for ShaderModel {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Vertex => Self::VertexShader,
            Stage::TessControl => Self::TessellationControlShader,
            Stage::TessEval => Self::TessellationEvaluationShader,
            Stage::Geometry => Self::GeometryShader,
            Stage::Fragment => Self::FragmentShader,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SampleScenario {
    /// Element reads and writes with constant indices
    Constant,
    /// Element access through a runtime index
    Dynamic,
    /// Whole-array assignment
    BulkCopy,
    /// Whole array passed to an `in` parameter
    InCall,
    /// Whole array passed to an `out` parameter
    OutCall,
    /// Whole array passed to an `inout` parameter
    InoutCall,
    /// Per-vertex input copied to the output (geometry stage only)
    Passthrough,
}
impl From<SampleScenario> for Scenario {
    fn from(value: SampleScenario) -> Self {
        match value {
            SampleScenario::Constant => Self::ConstantAccess,
            SampleScenario::Dynamic => Self::DynamicIndex,
            SampleScenario::BulkCopy => Self::BulkCopy,
            SampleScenario::InCall => Self::Call(VariableMode::FunctionIn),
            SampleScenario::OutCall => Self::Call(VariableMode::FunctionOut),
            SampleScenario::InoutCall => Self::Call(VariableMode::FunctionInOut),
            SampleScenario::Passthrough => Self::GeometryPassthrough,
        }
    }
}

/// Lowers gl_ClipDistance in a sample shader and prints the IR around the pass
#[derive(Parser)]
#[command(name = "lower-clip-distance")]
struct Cli {
    /// Pipeline stage of the sample shader
    #[arg(long, default_value = "vertex")]
    stage: Stage,

    /// Number of clip distances the shader declares
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    clip_distances: u32,

    /// Sample shader to build
    #[arg(long, default_value = "bulk-copy")]
    scenario: SampleScenario,

    /// Skip the clip distance lowering
    #[arg(long)]
    no_lower_clip_distance: bool,

    /// Print a unified diff of the IR instead of both dumps
    #[arg(long)]
    diff: bool,
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let options = CompilerOptions {
        lower_clip_distance: !cli.no_lower_clip_distance,
    };
    let stage = match cli.scenario {
        SampleScenario::Passthrough => ShaderModel::GeometryShader,
        _ => cli.stage.into(),
    };

    let symbol_scope_arena = ScopeArena::new();
    let global_scope = SymbolScope::new_toplevel(&symbol_scope_arena);
    let mut shader = sample::build(
        cli.scenario.into(),
        stage,
        cli.clip_distances as usize,
        global_scope,
    );

    let before = shader.dump_to_string()?;
    let modified = opt::optimize(&mut shader, &options);
    let after = shader.dump_to_string()?;

    let mut out = std::io::stdout().lock();
    if cli.diff {
        let diff = similar::TextDiff::from_lines(&before, &after);
        write!(out, "{}", diff.unified_diff().header("before", "after"))?;
    } else {
        writeln!(out, "before:")?;
        out.write_all(before.as_bytes())?;
        writeln!(out, "after (modified={modified}):")?;
        out.write_all(after.as_bytes())?;
    }

    Ok(())
}
