use crate::options::CompilerOptions;

use super::Shader;

mod clip_distance;

pub use self::clip_distance::{
    lower_clip_distance, packed_length, CLIP_DISTANCE_NAME, PACKED_CLIP_DISTANCE_NAME,
};

/// Runs every lowering pass enabled in `options` over `shader`.
/// Returns whether any of them changed the shader.
pub fn optimize(shader: &mut Shader, options: &CompilerOptions) -> bool {
    let mut modified = false;

    if options.lower_clip_distance {
        let m = lower_clip_distance(shader);
        println!("[Optimize] lower_clip_distance: modified={m}");
        modified |= m;
    }

    modified
}
