//! Composite tool tree and event routing.
//!
//! Every tool owns its children. Routed events go to active children first,
//! in registration order; the first one reporting [`EventOutcome::Handled`]
//! stops propagation, including to the parent's own handler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use egui::Shape;
use shared::{Completion, MapDocument};

use crate::input::{EventKind, EventOutcome, ViewportEvent};
use crate::viewport::camera::{Camera, OrthographicCamera, PerspectiveCamera};
use crate::viewport::mesh::LineMeshData;
use crate::viewport::MapViewport;

/// Shared handle to the active document
pub type DocumentHandle = Rc<RefCell<MapDocument>>;

/// Viewport kinds a tool works in. Routing does not filter on it; tools
/// ignore events from cameras they have no use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolUsage {
    View2D,
    View3D,
    Both,
}

impl ToolUsage {
    pub fn supports(self, camera: &Camera) -> bool {
        match self {
            ToolUsage::View2D => camera.is_2d(),
            ToolUsage::View3D => camera.is_3d(),
            ToolUsage::Both => true,
        }
    }
}

/// Index of a child in its parent's child list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildId(pub usize);

/// Frame timing passed to [`Tool::update_frame`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    pub milliseconds: u64,
}

/// State every tool carries: activity, usage, document and children
pub struct ToolNode {
    pub active: bool,
    pub usage: ToolUsage,
    document: Option<DocumentHandle>,
    children: Vec<Box<dyn Tool>>,
    redraw: Cell<bool>,
}

impl ToolNode {
    pub fn new(usage: ToolUsage) -> Self {
        Self {
            active: true,
            usage,
            document: None,
            children: Vec::new(),
            redraw: Cell::new(false),
        }
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn add_child(&mut self, child: Box<dyn Tool>) -> ChildId {
        self.children.push(child);
        ChildId(self.children.len() - 1)
    }

    pub fn child(&self, id: ChildId) -> Option<&dyn Tool> {
        self.children.get(id.0).map(|c| c.as_ref())
    }

    pub fn child_mut(&mut self, id: ChildId) -> Option<&mut (dyn Tool + 'static)> {
        self.children.get_mut(id.0).map(|c| c.as_mut())
    }

    pub fn children(&self) -> impl Iterator<Item = &dyn Tool> {
        self.children.iter().map(|c| c.as_ref())
    }

    /// Ask the host to redraw; cleared by [`take_redraw_request`]
    pub fn request_redraw(&self) {
        self.redraw.set(true);
    }
}

impl std::fmt::Debug for ToolNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolNode")
            .field("active", &self.active)
            .field("usage", &self.usage)
            .field("has_document", &self.document.is_some())
            .field("children", &self.children.len())
            .finish()
    }
}

/// A node of the tool tree. Every hook has a no-op default.
pub trait Tool {
    fn node(&self) -> &ToolNode;
    fn node_mut(&mut self) -> &mut ToolNode;
    fn name(&self) -> &str;

    /// The tool's own handler, reached only when no child handled the event.
    /// Match on `viewport.camera` to handle planar and perspective views.
    fn handle_event(
        &mut self,
        _viewport: &MapViewport,
        _kind: EventKind,
        _event: &ViewportEvent,
    ) -> EventOutcome {
        EventOutcome::Unhandled
    }

    fn update_frame(&mut self, _viewport: &MapViewport, _frame: FrameInfo) {}

    /// Return true to consume the hotkey
    fn filter_hotkey(&mut self, _hotkey: &str) -> bool {
        false
    }

    fn document_changed(&mut self) {}
    fn tool_selected(&mut self) {}
    fn tool_deselected(&mut self) {}
    fn transaction_completed(&mut self, _completion: &Completion) {}

    fn is_capturing_mouse_wheel(&self) -> bool {
        false
    }

    fn render_planar(&self, _camera: &OrthographicCamera) -> Vec<Shape> {
        Vec::new()
    }

    fn render_perspective(&self, _camera: &PerspectiveCamera) -> Vec<Shape> {
        Vec::new()
    }

    fn build_scene(&self, _mesh: &mut LineMeshData) {}
}

fn accepts(tool: &dyn Tool) -> bool {
    let node = tool.node();
    node.active && node.document.is_some()
}

/// Route one event through the tree, children first
pub fn route(
    tool: &mut dyn Tool,
    viewport: &MapViewport,
    kind: EventKind,
    event: &ViewportEvent,
) -> EventOutcome {
    if !accepts(tool) {
        return EventOutcome::Unhandled;
    }
    for child in tool.node_mut().children.iter_mut() {
        if route(child.as_mut(), viewport, kind, event).is_handled() {
            return EventOutcome::Handled;
        }
    }
    tool.handle_event(viewport, kind, event)
}

/// Deliver a frame update to the tool and every active descendant
pub fn broadcast_frame(tool: &mut dyn Tool, viewport: &MapViewport, frame: FrameInfo) {
    if !accepts(tool) {
        return;
    }
    for child in tool.node_mut().children.iter_mut() {
        broadcast_frame(child.as_mut(), viewport, frame);
    }
    tool.update_frame(viewport, frame);
}

/// Offer a hotkey to the tree; true if some tool consumed it
pub fn route_hotkey(tool: &mut dyn Tool, hotkey: &str) -> bool {
    if !accepts(tool) {
        return false;
    }
    for child in tool.node_mut().children.iter_mut() {
        if route_hotkey(child.as_mut(), hotkey) {
            return true;
        }
    }
    tool.filter_hotkey(hotkey)
}

/// Attach (or detach) a document to the tool and all of its descendants
pub fn attach_document(tool: &mut dyn Tool, document: Option<DocumentHandle>) {
    tool.node_mut().document = document.clone();
    for child in tool.node_mut().children.iter_mut() {
        attach_document(child.as_mut(), document.clone());
    }
    tool.document_changed();
    tool.node().request_redraw();
}

/// Activate a tool subtree and notify it
pub fn select_tool(tool: &mut dyn Tool) {
    tool.node_mut().active = true;
    tool.tool_selected();
    tool.node().request_redraw();
}

pub fn deselect_tool(tool: &mut dyn Tool) {
    tool.tool_deselected();
    tool.node_mut().active = false;
}

/// Hand a transaction result to the whole tree
pub fn notify_transaction(tool: &mut dyn Tool, completion: &Completion) {
    for child in tool.node_mut().children.iter_mut() {
        notify_transaction(child.as_mut(), completion);
    }
    tool.transaction_completed(completion);
}

/// True while the tool or any active descendant wants wheel input
pub fn capturing_mouse_wheel(tool: &dyn Tool) -> bool {
    if !tool.node().active {
        return false;
    }
    tool.is_capturing_mouse_wheel() || tool.node().children().any(capturing_mouse_wheel)
}

/// Collect and clear pending redraw requests across the tree
pub fn take_redraw_request(tool: &dyn Tool) -> bool {
    let node = tool.node();
    let mut requested = node.redraw.replace(false);
    for child in node.children() {
        requested |= take_redraw_request(child);
    }
    requested
}

/// Overlay shapes for a planar viewport: the tool's own, then its children's
pub fn render_planar_tree(tool: &dyn Tool, camera: &OrthographicCamera) -> Vec<Shape> {
    let node = tool.node();
    if !node.active || node.document.is_none() {
        return Vec::new();
    }
    let mut shapes = tool.render_planar(camera);
    for child in node.children() {
        shapes.extend(render_planar_tree(child, camera));
    }
    shapes
}

pub fn render_perspective_tree(tool: &dyn Tool, camera: &PerspectiveCamera) -> Vec<Shape> {
    let node = tool.node();
    if !node.active || node.document.is_none() {
        return Vec::new();
    }
    let mut shapes = tool.render_perspective(camera);
    for child in node.children() {
        shapes.extend(render_perspective_tree(child, camera));
    }
    shapes
}

/// Per-frame scene buffer for the whole tree
pub fn build_scene_tree(tool: &dyn Tool, mesh: &mut LineMeshData) {
    let node = tool.node();
    if !node.active || node.document.is_none() {
        return;
    }
    tool.build_scene(mesh);
    for child in node.children() {
        build_scene_tree(child, mesh);
    }
}
