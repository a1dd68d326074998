//! Per-pixel shading callbacks.
//!
//! A shader receives the screen-space triangle, the same triangle in view
//! space and the screen-space barycentric weights of the pixel centre, and
//! returns the pixel color.

use zbuf_core::{Barycentric, Color, Triangle};

/// Called as `shader(screen, view, bary)` for every pixel that passes the
/// depth test.
///
/// `bary` holds the screen-space (affine) weights of the pixel centre in
/// `screen`. They are not perspective-corrected: a shader interpolating
/// view-space attributes recovers the depth with `view.depth_at(bary)` and
/// passes it to `view.color_at`, as the shaders below do.
pub type Shader = Box<dyn Fn(&Triangle, &Triangle, Barycentric) -> Color>;

/// Colors by the facing direction in view space, mapped from `[-1, 1]` to
/// `[0, 1]`. Flat per triangle.
pub fn normal_shader() -> Shader {
    Box::new(|_screen, view, _bary| (view.facing() + Color::ONE) * 0.5)
}

/// Perspective-correct interpolation of the vertex colors.
pub fn vertex_color_shader() -> Shader {
    Box::new(|_screen, view, bary| {
        let z = view.depth_at(bary);
        view.color_at(bary.0, bary.1, bary.2, z)
    })
}

/// Greyscale by distance from the camera: white up close, fading towards
/// black with depth.
pub fn depth_shader() -> Shader {
    Box::new(|_screen, view, bary| {
        let z = view.depth_at(bary);
        Color::splat(1.0 / (1.0 - z).max(1.0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbuf_math::Vec3;

    fn view_triangle(z: f32) -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(0.0, 1.0, z),
        )
        .with_colors([Color::X, Color::Y, Color::Z])
    }

    #[test]
    fn test_normal_shader() {
        let t = view_triangle(-2.0);
        let color = normal_shader()(&t, &t, (0.3, 0.3, 0.4));
        assert_eq!(color, Color::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn test_vertex_color_shader_at_vertex() {
        let t = view_triangle(-2.0);
        let color = vertex_color_shader()(&t, &t, (0.0, 1.0, 0.0));
        assert!((color - Color::Y).length() < 1e-5);
    }

    #[test]
    fn test_depth_shader_fades() {
        let near = view_triangle(-0.5);
        let far = view_triangle(-9.0);
        let shader = depth_shader();
        let bary = (0.2, 0.3, 0.5);

        let a = shader(&near, &near, bary);
        let b = shader(&far, &far, bary);
        assert!(a.x > b.x);
        assert!((b.x - 0.1).abs() < 1e-5);
    }
}
