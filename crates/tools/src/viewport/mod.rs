//! Viewport state seen by the tools: the camera and the input lock

pub mod camera;
pub mod mesh;
pub mod overlays;

use std::cell::Cell;

use camera::Camera;

/// A viewport hosting the tools
#[derive(Debug)]
pub struct MapViewport {
    pub camera: Camera,
    /// Set while a tool owns the pointer, so the host suppresses camera navigation
    input_locked: Cell<bool>,
}

impl MapViewport {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            input_locked: Cell::new(false),
        }
    }

    pub fn is_2d(&self) -> bool {
        self.camera.is_2d()
    }

    pub fn is_3d(&self) -> bool {
        self.camera.is_3d()
    }

    pub fn acquire_input_lock(&self) {
        self.input_locked.set(true);
    }

    pub fn release_input_lock(&self) {
        self.input_locked.set(false);
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_locked.get()
    }
}
