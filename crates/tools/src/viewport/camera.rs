use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use shared::Ray;

/// Axis pair shown by a 2D viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewDirection {
    /// Looking down -Z; screen axes are world X and Y
    Top,
    /// Looking along +X; screen axes are world Y and Z
    Front,
    /// Looking along -Y; screen axes are world X and Z
    Side,
}

/// Camera of a plane-projected viewport
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub direction: ViewDirection,
    /// World position at the center of the viewport
    pub position: Vec3,
    /// Screen pixels per world unit
    pub zoom: f32,
    pub width: f32,
    pub height: f32,
}

impl OrthographicCamera {
    pub fn new(direction: ViewDirection, width: f32, height: f32) -> Self {
        Self {
            direction,
            position: Vec3::ZERO,
            zoom: 1.0,
            width,
            height,
        }
    }

    /// Map a world point into the camera plane (depth goes to z = 0)
    pub fn flatten(&self, c: Vec3) -> Vec3 {
        match self.direction {
            ViewDirection::Top => Vec3::new(c.x, c.y, 0.0),
            ViewDirection::Front => Vec3::new(c.y, c.z, 0.0),
            ViewDirection::Side => Vec3::new(c.x, c.z, 0.0),
        }
    }

    /// Inverse of [`flatten`](Self::flatten); the depth axis is zero
    pub fn expand(&self, c: Vec3) -> Vec3 {
        match self.direction {
            ViewDirection::Top => Vec3::new(c.x, c.y, 0.0),
            ViewDirection::Front => Vec3::new(0.0, c.x, c.y),
            ViewDirection::Side => Vec3::new(c.x, 0.0, c.y),
        }
    }

    /// Keep only the depth component of `c`
    pub fn unused_coordinate(&self, c: Vec3) -> Vec3 {
        match self.direction {
            ViewDirection::Top => Vec3::new(0.0, 0.0, c.z),
            ViewDirection::Front => Vec3::new(c.x, 0.0, 0.0),
            ViewDirection::Side => Vec3::new(0.0, c.y, 0.0),
        }
    }

    /// World direction pointing out of the screen
    pub fn depth_axis(&self) -> Vec3 {
        self.expand(Vec3::X).cross(self.expand(Vec3::Y))
    }

    pub fn screen_to_world(&self, x: f32, y: f32) -> Vec3 {
        let offset = Vec3::new(
            (x - self.width / 2.0) / self.zoom,
            -(y - self.height / 2.0) / self.zoom,
            0.0,
        );
        self.position + self.expand(offset)
    }

    pub fn world_to_screen(&self, world: Vec3) -> egui::Pos2 {
        let flat = self.flatten(world - self.position);
        egui::pos2(
            self.width / 2.0 + flat.x * self.zoom,
            self.height / 2.0 - flat.y * self.zoom,
        )
    }

    /// Convert a length in screen pixels to world units
    pub fn pixels_to_units(&self, pixels: f32) -> f32 {
        pixels / self.zoom
    }
}

/// Z-up camera of a perspective viewport
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    pub width: f32,
    pub height: f32,
}

impl PerspectiveCamera {
    pub fn new(position: Vec3, look_at: Vec3, width: f32, height: f32) -> Self {
        Self {
            position,
            look_at,
            fov: 60.0_f32.to_radians(),
            width,
            height,
        }
    }

    fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Z)
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect(), 1.0, 50_000.0)
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a 3D point to 2D screen coords, None when behind the camera
    pub fn project(&self, point: Vec3) -> Option<egui::Pos2> {
        let p = self.view_projection() * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        let screen_x = self.width * 0.5 + ndc.x * self.width * 0.5;
        let screen_y = self.height * 0.5 - ndc.y * self.height * 0.5;
        Some(egui::pos2(screen_x, screen_y))
    }

    /// Cast a ray from a screen position into the 3D scene
    pub fn cast_ray_from_screen(&self, x: f32, y: f32) -> Ray {
        // Screen → NDC
        let ndc_x = (x - self.width * 0.5) / (self.width * 0.5);
        let ndc_y = -(y - self.height * 0.5) / (self.height * 0.5);

        let vp_inv = self.view_projection().inverse();

        // Unproject near and far points
        let near_world = vp_inv * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        Ray::new(self.position, far - near)
    }
}

/// Camera of a viewport, tagged by projection kind
#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    Planar(OrthographicCamera),
    Perspective(PerspectiveCamera),
}

impl Camera {
    pub fn is_2d(&self) -> bool {
        matches!(self, Camera::Planar(_))
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, Camera::Perspective(_))
    }

    pub fn as_planar(&self) -> Option<&OrthographicCamera> {
        match self {
            Camera::Planar(c) => Some(c),
            Camera::Perspective(_) => None,
        }
    }
}
