/// Switches for the lowering passes run by [`crate::ir::opt::optimize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Pack `gl_ClipDistance` into an array of vec4s.
    pub lower_clip_distance: bool,
}
impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            lower_clip_distance: true,
        }
    }
}
