use std::borrow::Cow;

use crate::device::{PARAMS_BINDING, POSITIONS_BINDING};
use crate::plan::WORKGROUP_SIZE;

/// A parametric surface `(u, v, t) -> position` over `u, v` in `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct GraphFunction {
    pub name: &'static str,
    body: &'static str,
}

/// Kernel library in registry order; ids index into this table.
pub const FUNCTION_LIBRARY: &[GraphFunction] = &[
    GraphFunction {
        name: "wave",
        body: "    return vec3<f32>(u, sin(PI * (u + v + t)), v);",
    },
    GraphFunction {
        name: "multi_wave",
        body: "    var y = sin(PI * (u + 0.5 * t));
    y += 0.5 * sin(2.0 * PI * (v + t));
    y += sin(PI * (u + v + 0.25 * t));
    return vec3<f32>(u, y / 2.5, v);",
    },
    GraphFunction {
        name: "ripple",
        body: "    let d = sqrt(u * u + v * v);
    let y = sin(PI * (4.0 * d - t)) / (1.0 + 10.0 * d);
    return vec3<f32>(u, y, v);",
    },
    GraphFunction {
        name: "sphere",
        body: "    let r = 0.9 + 0.1 * sin(PI * (6.0 * u + 4.0 * v + t));
    let s = r * cos(0.5 * PI * v);
    return vec3<f32>(s * sin(PI * u), r * sin(0.5 * PI * v), s * cos(PI * u));",
    },
    GraphFunction {
        name: "torus",
        body: "    let r1 = 0.7 + 0.1 * sin(PI * (6.0 * u + 0.5 * t));
    let r2 = 0.15 + 0.05 * sin(PI * (8.0 * u + 4.0 * v + 2.0 * t));
    let s = r1 + r2 * cos(PI * v);
    return vec3<f32>(s * sin(PI * u), r2 * sin(PI * v), s * cos(PI * u));",
    },
];

pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTION_LIBRARY.iter().map(|function| function.name)
}

pub fn kernel_entry_point(from: &str, to: &str) -> String {
    format!("kernel_{from}_to_{to}")
}

/// Entry points ordered so that position `to + from * N` morphs `from -> to`.
pub fn kernel_entry_points() -> Vec<String> {
    FUNCTION_LIBRARY
        .iter()
        .flat_map(|from| {
            FUNCTION_LIBRARY
                .iter()
                .map(move |to| kernel_entry_point(from.name, to.name))
        })
        .collect()
}

/// Builds one compute module holding every function and all `N²` kernels.
pub fn compute_shader_source() -> String {
    let mut source = format!(
        r#"const PI: f32 = 3.14159265358979;

struct Point {{
    x: f32,
    y: f32,
    z: f32,
}}

struct Params {{
    resolution: u32,
    step: f32,
    time: f32,
    transition_progress: f32,
}}

@group(0) @binding({POSITIONS_BINDING}) var<storage, read_write> positions: array<Point>;
@group(0) @binding({PARAMS_BINDING}) var<uniform> params: Params;

fn grid_uv(id: vec2<u32>) -> vec2<f32> {{
    return (vec2<f32>(id) + vec2<f32>(0.5)) * params.step - vec2<f32>(1.0);
}}

fn store_point(id: vec2<u32>, p: vec3<f32>) {{
    positions[id.x + id.y * params.resolution] = Point(p.x, p.y, p.z);
}}
"#
    );

    for function in FUNCTION_LIBRARY {
        source.push_str(&format!(
            "\nfn {name}(u: f32, v: f32, t: f32) -> vec3<f32> {{\n{body}\n}}\n",
            name = function.name,
            body = function.body
        ));
    }

    for from in FUNCTION_LIBRARY {
        for to in FUNCTION_LIBRARY {
            let point = if from.name == to.name {
                format!("{}(uv.x, uv.y, params.time)", to.name)
            } else {
                format!(
                    "mix({}(uv.x, uv.y, params.time), {}(uv.x, uv.y, params.time), vec3<f32>(params.transition_progress))",
                    from.name, to.name
                )
            };
            source.push_str(&format!(
                r#"
@compute @workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE}, 1)
fn {entry}(@builtin(global_invocation_id) id: vec3<u32>) {{
    if (id.x >= params.resolution || id.y >= params.resolution) {{
        return;
    }}
    let uv = grid_uv(id.xy);
    store_point(id.xy, {point});
}}
"#,
                entry = kernel_entry_point(from.name, to.name),
            ));
        }
    }

    source
}

/// Instanced cube renderer reading positions written by the compute pass.
pub fn render_shader_source() -> String {
    format!(
        r#"struct Point {{
    x: f32,
    y: f32,
    z: f32,
}}

struct DrawParams {{
    view_proj: mat4x4<f32>,
    step: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}}

@group(0) @binding({POSITIONS_BINDING}) var<storage, read> positions: array<Point>;
@group(0) @binding({PARAMS_BINDING}) var<uniform> draw: DrawParams;

struct VertexOut {{
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) normal: vec3<f32>,
}}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex: u32,
    @builtin(instance_index) instance: u32,
) -> VertexOut {{
    // Cube corners are encoded as xyz bits; six faces of two triangles.
    var corners = array<u32, 36>(
        1u, 3u, 7u, 1u, 7u, 5u,
        0u, 4u, 6u, 0u, 6u, 2u,
        2u, 6u, 7u, 2u, 7u, 3u,
        0u, 1u, 5u, 0u, 5u, 4u,
        4u, 5u, 7u, 4u, 7u, 6u,
        0u, 2u, 3u, 0u, 3u, 1u,
    );
    var normals = array<vec3<f32>, 6>(
        vec3<f32>(1.0, 0.0, 0.0),
        vec3<f32>(-1.0, 0.0, 0.0),
        vec3<f32>(0.0, 1.0, 0.0),
        vec3<f32>(0.0, -1.0, 0.0),
        vec3<f32>(0.0, 0.0, 1.0),
        vec3<f32>(0.0, 0.0, -1.0),
    );

    let bits = corners[vertex];
    let corner = vec3<f32>(
        f32(bits & 1u),
        f32((bits >> 1u) & 1u),
        f32((bits >> 2u) & 1u),
    ) - vec3<f32>(0.5);

    let p = positions[instance];
    let center = vec3<f32>(p.x, p.y, p.z);
    let world = center + corner * draw.step;

    var out: VertexOut;
    out.clip = draw.view_proj * vec4<f32>(world, 1.0);
    out.color = saturate(center * 0.5 + vec3<f32>(0.5));
    out.normal = normals[vertex / 6u];
    return out;
}}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {{
    let light = normalize(vec3<f32>(0.4, 0.8, 0.5));
    let diffuse = 0.35 + 0.65 * max(dot(normalize(in.normal), light), 0.0);
    return vec4<f32>(in.color * diffuse, 1.0);
}}
"#
    )
}

pub(crate) fn compile_compute_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gpugraph kernels"),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(compute_shader_source())),
    })
}

pub(crate) fn compile_render_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gpugraph points"),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(render_shader_source())),
    })
}
