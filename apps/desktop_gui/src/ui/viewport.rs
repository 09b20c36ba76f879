//! Software rendering of a [`SceneDescription`]: an orbit camera, a perspective
//! projection and painter's-algorithm box faces.

use client_core::scene::{
    CameraPreset, Light, Mesh, OrbitControls, Rgb, SceneDescription, Vec3, CAMERA_TARGET,
};
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke};

const NEAR_PLANE: f32 = 0.1;
const MAX_PITCH: f32 = 1.5;
const DRAG_RADIANS_PER_POINT: f32 = 0.01;
const ZOOM_PER_SCROLL_POINT: f32 = 0.01;
/// Fraction of the orbit distance moved per dragged point.
const PAN_PER_POINT: f32 = 0.002;

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(a: Vec3) -> f32 {
    dot(a, a).sqrt()
}

fn normalize(a: Vec3) -> Vec3 {
    let len = length(a);
    if len <= f32::EPSILON {
        a
    } else {
        scale(a, 1.0 / len)
    }
}

/// Rotation about the vertical axis through the origin.
fn rotate_y(p: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    [p[0] * cos + p[2] * sin, p[1], -p[0] * sin + p[2] * cos]
}

/// Spherical camera around a target that starts at [`CAMERA_TARGET`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_degrees: f32,
}

impl OrbitCamera {
    pub fn from_position(position: Vec3, fov_degrees: f32) -> Self {
        let offset = sub(position, CAMERA_TARGET);
        let distance = length(offset).max(NEAR_PLANE);
        Self {
            target: CAMERA_TARGET,
            yaw: offset[0].atan2(offset[2]),
            pitch: (offset[1] / distance).clamp(-1.0, 1.0).asin(),
            distance,
            fov_degrees,
        }
    }

    pub fn from_preset(preset: CameraPreset, fov_degrees: f32) -> Self {
        Self::from_position(preset.position(), fov_degrees)
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        add(
            self.target,
            scale(
                [cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw],
                self.distance,
            ),
        )
    }

    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw -= delta_x * DRAG_RADIANS_PER_POINT;
        self.pitch = (self.pitch + delta_y * DRAG_RADIANS_PER_POINT).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, scroll: f32, controls: &OrbitControls) {
        if controls.enable_zoom {
            self.distance =
                controls.clamp_distance(self.distance * (1.0 - scroll * ZOOM_PER_SCROLL_POINT));
        }
    }

    /// Moves the target in the view plane; dragging right slides the scene right.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32, controls: &OrbitControls) {
        if !controls.enable_pan {
            return;
        }
        let (_, right, up) = self.basis();
        let step = self.distance * PAN_PER_POINT;
        self.target = add(
            self.target,
            add(scale(right, -delta_x * step), scale(up, delta_y * step)),
        );
    }

    /// Forward, right and up unit vectors of the view.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = normalize(sub(self.target, self.eye()));
        let right = normalize(cross(forward, [0.0, 1.0, 0.0]));
        let up = cross(right, forward);
        (forward, right, up)
    }

    /// Screen position of `point`, or `None` when it is behind the camera.
    pub fn project(&self, point: Vec3, rect: Rect) -> Option<Pos2> {
        let eye = self.eye();
        let (forward, right, up) = self.basis();

        let relative = sub(point, eye);
        let depth = dot(relative, forward);
        if depth < NEAR_PLANE {
            return None;
        }
        let focal = (rect.height() * 0.5) / (self.fov_degrees.to_radians() * 0.5).tan();
        let center = rect.center();
        Some(Pos2::new(
            center.x + dot(relative, right) / depth * focal,
            center.y - dot(relative, up) / depth * focal,
        ))
    }
}

pub fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

fn shade(rgb: Rgb, factor: f32) -> Color32 {
    let apply = |channel: u8| (channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
    Color32::from_rgb(apply(rgb.r), apply(rgb.g), apply(rgb.b))
}

const FACES: [([usize; 4], Vec3); 6] = [
    ([0, 4, 6, 2], [-1.0, 0.0, 0.0]),
    ([1, 3, 7, 5], [1.0, 0.0, 0.0]),
    ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
    ([2, 6, 7, 3], [0.0, 1.0, 0.0]),
    ([0, 2, 3, 1], [0.0, 0.0, -1.0]),
    ([4, 5, 7, 6], [0.0, 0.0, 1.0]),
];

/// One visible quad of a mesh, already in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub corners: [Vec3; 4],
    pub normal: Vec3,
    pub center: Vec3,
    pub color: Rgb,
}

/// Corners indexed by bit: x = 1, y = 2, z = 4.
fn box_corners(mesh: &Mesh) -> [Vec3; 8] {
    let half = scale(mesh.size, 0.5);
    std::array::from_fn(|i| {
        let pick = |bit: usize, axis: usize| {
            if i & bit == 0 {
                -half[axis]
            } else {
                half[axis]
            }
        };
        add(mesh.position, [pick(1, 0), pick(2, 1), pick(4, 2)])
    })
}

/// Faces of every mesh facing `eye`, after the group yaw `sway`.
pub fn visible_faces(scene: &SceneDescription, eye: Vec3, sway: f32) -> Vec<Face> {
    let mut faces = Vec::new();
    for mesh in &scene.meshes {
        let corners = box_corners(mesh).map(|corner| rotate_y(corner, sway));
        for (indices, normal) in FACES {
            let normal = rotate_y(normal, sway);
            let quad = indices.map(|index| corners[index]);
            let center = scale(
                quad.iter().fold([0.0; 3], |sum, corner| add(sum, *corner)),
                0.25,
            );
            if dot(normal, sub(eye, center)) > 0.0 {
                faces.push(Face {
                    corners: quad,
                    normal,
                    center,
                    color: mesh.material.color,
                });
            }
        }
    }
    // Farthest first.
    faces.sort_by(|a, b| {
        let da = length(sub(a.center, eye));
        let db = length(sub(b.center, eye));
        db.total_cmp(&da)
    });
    faces
}

/// Lambert factor from the scene's light rig, capped at full brightness.
pub fn light_factor(lights: &[Light], normal: Vec3, point: Vec3) -> f32 {
    lights
        .iter()
        .map(|light| match light {
            Light::Ambient { intensity } => *intensity,
            Light::Directional {
                position,
                intensity,
                ..
            }
            | Light::Point {
                position,
                intensity,
            } => intensity * dot(normal, normalize(sub(*position, point))).max(0.0),
        })
        .sum::<f32>()
        .min(1.0)
}

fn paint_grid(painter: &Painter, rect: Rect, scene: &SceneDescription, camera: &OrbitCamera) {
    let grid = &scene.grid;
    let half = grid.size * 0.5;
    let step = grid.size / grid.divisions.max(1) as f32;
    for i in 0..=grid.divisions {
        let offset = -half + step * i as f32;
        let color = if offset.abs() <= f32::EPSILON {
            to_color32(grid.center_color)
        } else {
            to_color32(grid.line_color)
        };
        for (from, to) in [
            ([offset, 0.0, -half], [offset, 0.0, half]),
            ([-half, 0.0, offset], [half, 0.0, offset]),
        ] {
            if let (Some(a), Some(b)) = (camera.project(from, rect), camera.project(to, rect)) {
                painter.line_segment([a, b], Stroke::new(1.0, color));
            }
        }
    }
}

pub fn paint_scene(
    painter: &Painter,
    rect: Rect,
    scene: &SceneDescription,
    camera: &OrbitCamera,
    sway: f32,
) {
    painter.rect_filled(rect, 0.0, to_color32(scene.backdrop.color));
    paint_grid(painter, rect, scene, camera);

    let eye = camera.eye();
    for face in visible_faces(scene, eye, sway) {
        let points: Option<Vec<Pos2>> = face
            .corners
            .iter()
            .map(|corner| camera.project(*corner, rect))
            .collect();
        let Some(points) = points else {
            continue;
        };
        let factor = light_factor(&scene.lights, face.normal, face.center);
        painter.add(Shape::convex_polygon(
            points,
            shade(face.color, factor),
            Stroke::new(1.0, shade(face.color, factor * 0.7)),
        ));
    }
}
