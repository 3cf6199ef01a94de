/// WGSL for the fixed textured, two-light pipeline.
///
/// Group 0 holds per-draw constants at a dynamic offset. Group 1 holds the
/// material's texture and sampler. Matrices are column-major and applied as
/// `M * v`.
pub const SCENE_SHADER: &str = r#"
struct DirectionalLight {
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    direction: vec3<f32>,
};

struct DrawConstants {
    world: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    light: DirectionalLight,
    light2: DirectionalLight,
};

@group(0) @binding(0)
var<uniform> constants: DrawConstants;

@group(1) @binding(0)
var diffuse_texture: texture_2d<f32>;
@group(1) @binding(1)
var basic_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world_pos = constants.world * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = constants.projection * constants.view * world_pos;
    out.normal = (constants.world * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    return out;
}

fn light_amount(light: DirectionalLight, normal: vec3<f32>) -> vec4<f32> {
    let to_light = normalize(-light.direction);
    let n_dot_l = saturate(dot(normal, to_light));
    return light.diffuse * n_dot_l + light.ambient;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.normal);
    let surface = textureSample(diffuse_texture, basic_sampler, in.uv);
    let lit = light_amount(constants.light, normal) + light_amount(constants.light2, normal);
    return vec4<f32>(surface.rgb * lit.rgb, surface.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_present() {
        assert!(SCENE_SHADER.contains("fn vs_main"));
        assert!(SCENE_SHADER.contains("fn fs_main"));
    }
}
