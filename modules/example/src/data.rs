//! Mesh data for the example scene.

#[rustfmt::skip]
pub const TRIANGLE_POSITIONS: [f32; 9] = [
    -0.5, -0.5, 0.0, // left
     0.5, -0.5, 0.0, // right
     0.0,  0.5, 0.0, // top
];

#[rustfmt::skip]
pub const TRIANGLE_COLORS: [f32; 12] = [
    1.0, 0.0, 0.0, 0.5,
    0.0, 1.0, 0.0, 0.5,
    0.0, 0.0, 1.0, 0.5,
];

#[rustfmt::skip]
pub const SQUARE_POSITIONS: [f32; 12] = [
     0.5,  0.5, 0.0, // top right
     0.5, -0.5, 0.0, // bottom right
    -0.5, -0.5, 0.0, // bottom left
    -0.5,  0.5, 0.0, // top left
];

#[rustfmt::skip]
pub const SQUARE_INDICES: [u32; 6] = [
    0, 1, 3,
    1, 2, 3,
];

#[rustfmt::skip]
pub const CUBE_POSITIONS: [f32; 24] = [
    -0.5,  0.5, -0.5, // A
    -0.5,  0.5,  0.5, // B
     0.5,  0.5, -0.5, // C
     0.5,  0.5,  0.5, // D
    -0.5, -0.5, -0.5, // E
    -0.5, -0.5,  0.5, // F
     0.5, -0.5, -0.5, // G
     0.5, -0.5,  0.5, // H
];

#[rustfmt::skip]
pub const CUBE_COLORS: [f32; 32] = [
    0.0, 0.0, 0.0, 1.0,
    0.0, 0.0, 1.0, 1.0,
    0.0, 1.0, 0.0, 1.0,
    0.0, 1.0, 1.0, 1.0,
    1.0, 0.0, 0.0, 1.0,
    1.0, 0.0, 1.0, 1.0,
    1.0, 1.0, 0.0, 1.0,
    1.0, 1.0, 1.0, 1.0,
];

#[rustfmt::skip]
pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 1, 2, 3, // top
    4, 5, 6, 5, 6, 7, // bottom
    0, 1, 5, 0, 4, 5, // left
    2, 3, 7, 2, 6, 7, // right
    0, 2, 6, 0, 4, 6, // front
    1, 5, 7, 1, 3, 7, // back
];

/// `color` repeated for `vertices` vertices.
pub fn solid_color(color: [f32; 4], vertices: usize) -> Vec<f32> {
    color.repeat(vertices)
}
