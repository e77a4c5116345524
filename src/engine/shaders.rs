// Uniform layout shared by every pass:
//   group(0) scene: view_proj, light position, eye, params
//   group(1) object: model matrix, colour, params
// params (scene): x ambient, y shadow extent (0 = infinity), z shadow alpha.
// params (object): x = 1 draws the ground checker.

pub const SCENE_SHADER: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    light_pos: vec4<f32>,
    eye_pos: vec4<f32>,
    params: vec4<f32>,
}

struct Object {
    model: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> scene: Scene;

@group(1) @binding(0)
var<uniform> object: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world = object.model * vec4<f32>(input.position, 1.0);
    output.clip_position = scene.view_proj * world;
    output.world_pos = world.xyz;
    output.normal = (object.model * vec4<f32>(input.normal, 0.0)).xyz;
    output.uv = input.uv;
    return output;
}

fn checker(p: vec3<f32>) -> f32 {
    let cell = floor(p.xz * 0.5);
    let parity = (i32(cell.x) + i32(cell.y)) & 1;
    return select(0.75, 1.0, parity == 0);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(input.normal);
    let light_dir = normalize(scene.light_pos.xyz - input.world_pos);
    let diffuse = max(dot(n, light_dir), 0.0);
    var base = object.color.rgb;
    if (object.params.x > 0.5) {
        base = base * checker(input.world_pos);
    }
    let lit = base * (scene.params.x + (1.0 - scene.params.x) * diffuse);
    return vec4<f32>(lit, object.color.a);
}

@fragment
fn fs_shadow(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, scene.params.z);
}
"#;

pub const SHADOW_VOLUME_SHADER: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    light_pos: vec4<f32>,
    eye_pos: vec4<f32>,
    params: vec4<f32>,
}

struct Object {
    model: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> scene: Scene;

@group(1) @binding(0)
var<uniform> object: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    let world = (object.model * vec4<f32>(input.position, 1.0)).xyz;
    let normal = (object.model * vec4<f32>(input.normal, 0.0)).xyz;
    let from_light = world - scene.light_pos.xyz;

    // vertices of faces turned away from the light go out along the light ray
    if (dot(normal, from_light) > 0.0) {
        if (scene.params.y <= 0.0) {
            return scene.view_proj * vec4<f32>(from_light, 0.0);
        }
        let extruded = world + normalize(from_light) * scene.params.y;
        return scene.view_proj * vec4<f32>(extruded, 1.0);
    }
    return scene.view_proj * vec4<f32>(world, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}

@fragment
fn fs_debug() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.85, 0.2, 0.25);
}
"#;

pub const STENCIL_DIAGNOSTIC_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = vec4<f32>(input.position, 0.0, 1.0);
    output.color = input.color;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.color;
}
"#;
