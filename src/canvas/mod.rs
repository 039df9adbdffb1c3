//! Composition canvas: one immovable background page plus placed marks.
//!
//! Every operation is a no-op until a background has been installed with
//! [`CompositionCanvas::load_background`].

pub mod click;
pub mod edit;
pub mod object;
pub mod raster;

use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::config::settings::MarkDefaults;
use crate::error::DocSignError;
use crate::mark::{MarkBitmap, MarkKind};
use crate::render::PageBitmap;
use click::{ClickKind, ClickTracker, Clock, SystemClock};
use edit::{DefaultEditPolicy, EditDecision, EditHandler};
use object::{AnnotationObject, MarkId, ObjectId, Transform};

/// An entry of the canvas object list, background first.
#[derive(Debug, Clone, Copy)]
pub enum CanvasObject<'a> {
    Background(&'a PageBitmap),
    Annotation(&'a AnnotationObject),
}

/// What lies under a canvas point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Annotation(ObjectId),
    Background,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Result of a double click on a placed mark.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    /// The mark as it was when the edit was requested.
    pub object: AnnotationObject,
    pub decision: EditDecision,
}

#[derive(Debug, Clone)]
pub enum PointerOutcome {
    /// Not initialized, or not the primary button.
    Ignored,
    Selected(ObjectId),
    /// Background or empty space was pressed; selection cleared.
    Deselected,
    Edited(EditOutcome),
}

pub struct CompositionCanvas {
    background: Option<PageBitmap>,
    objects: Vec<AnnotationObject>,
    selected: Option<ObjectId>,
    next_id: u64,
    clicks: ClickTracker,
    clock: Box<dyn Clock>,
    edit_handler: Box<dyn EditHandler>,
    signature_defaults: MarkDefaults,
    initial_defaults: MarkDefaults,
}

impl Default for CompositionCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionCanvas {
    pub fn new() -> Self {
        Self {
            background: None,
            objects: Vec::new(),
            selected: None,
            next_id: 1,
            clicks: ClickTracker::default(),
            clock: Box::new(SystemClock::new()),
            edit_handler: Box::new(DefaultEditPolicy),
            signature_defaults: MarkDefaults::SIGNATURE,
            initial_defaults: MarkDefaults::INITIAL,
        }
    }

    pub fn with_handler(mut self, handler: impl EditHandler + 'static) -> Self {
        self.edit_handler = Box::new(handler);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_double_click_window(mut self, window: Duration) -> Self {
        self.clicks = ClickTracker::new(window);
        self
    }

    pub fn with_mark_defaults(mut self, signature: MarkDefaults, initial: MarkDefaults) -> Self {
        self.signature_defaults = signature;
        self.initial_defaults = initial;
        self
    }

    pub fn set_edit_handler(&mut self, handler: impl EditHandler + 'static) {
        self.edit_handler = Box::new(handler);
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_initialized(&self) -> bool {
        self.background.is_some()
    }

    /// Replace everything with `bitmap` as the sole, non-interactive
    /// background. The canvas takes the bitmap's exact pixel size.
    pub fn load_background(&mut self, bitmap: PageBitmap) {
        debug!(
            page = bitmap.page_index(),
            width = bitmap.width(),
            height = bitmap.height(),
            removed = self.objects.len(),
            "canvas background loaded"
        );
        self.objects.clear();
        self.selected = None;
        self.clicks.reset();
        self.background = Some(bitmap);
    }

    /// Drop the background and every object (new document).
    pub fn reset(&mut self) {
        self.background = None;
        self.objects.clear();
        self.selected = None;
        self.clicks.reset();
    }

    pub fn background(&self) -> Option<&PageBitmap> {
        self.background.as_ref()
    }

    /// Canvas pixel size, equal to the background's.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.background.as_ref().map(|b| (b.width(), b.height()))
    }

    /// All objects in stacking order; the background is always first.
    pub fn objects(&self) -> impl Iterator<Item = CanvasObject<'_>> {
        self.background
            .iter()
            .map(CanvasObject::Background)
            .chain(self.objects.iter().map(CanvasObject::Annotation))
    }

    /// Placed marks in stacking order.
    pub fn annotations(&self) -> &[AnnotationObject] {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut AnnotationObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn selected_id(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&AnnotationObject> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Select a placed mark. Returns `false` if it does not exist.
    pub fn select(&mut self, id: ObjectId) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Place `mark` at its kind's default transform and select it.
    ///
    /// Initials get a fresh [`MarkId`]. Returns `None` before a background
    /// is installed.
    pub fn place(&mut self, mark: &MarkBitmap) -> Option<ObjectId> {
        if !self.is_initialized() {
            return None;
        }
        let kind = mark.kind();
        let defaults = match kind {
            MarkKind::Signature => self.signature_defaults,
            MarkKind::Initial => self.initial_defaults,
        };
        let mark_id = match kind {
            MarkKind::Signature => None,
            MarkKind::Initial => Some(MarkId(self.next_id())),
        };
        let id = ObjectId(self.next_id());
        self.objects.push(AnnotationObject {
            id,
            kind,
            image: mark.shared_image(),
            transform: Transform::new(defaults.left, defaults.top, defaults.scale),
            mark_id,
        });
        self.selected = Some(id);
        debug!(%kind, ?id, ?mark_id, "mark placed");
        Some(id)
    }

    /// Add an unselected mark with an explicit transform.
    pub fn add_reproduction(
        &mut self,
        kind: MarkKind,
        image: Arc<RgbaImage>,
        transform: Transform,
        mark_id: Option<MarkId>,
    ) -> Option<ObjectId> {
        if !self.is_initialized() {
            return None;
        }
        let id = ObjectId(self.next_id());
        self.objects.push(AnnotationObject {
            id,
            kind,
            image,
            transform,
            mark_id,
        });
        Some(id)
    }

    /// Topmost placed mark under the point, else the background if the point
    /// is on the page, else nothing.
    pub fn hit_test(&self, x: f32, y: f32) -> HitTarget {
        let Some(background) = &self.background else {
            return HitTarget::None;
        };
        if let Some(object) = self.objects.iter().rev().find(|o| o.contains(x, y)) {
            return HitTarget::Annotation(object.id);
        }
        let on_page = x >= 0.0
            && y >= 0.0
            && x < background.width() as f32
            && y < background.height() as f32;
        if on_page {
            HitTarget::Background
        } else {
            HitTarget::None
        }
    }

    /// Handle a pointer press: selection, or an edit on double click.
    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) -> PointerOutcome {
        if !self.is_initialized() || button != PointerButton::Primary {
            return PointerOutcome::Ignored;
        }

        let hit = self.hit_test(x, y);
        let target = match hit {
            HitTarget::Annotation(id) => Some(id),
            HitTarget::Background | HitTarget::None => None,
        };
        let click = self.clicks.press(target, self.clock.now());

        let Some(id) = target else {
            self.selected = None;
            return PointerOutcome::Deselected;
        };

        if click == ClickKind::Single {
            self.selected = Some(id);
            return PointerOutcome::Selected(id);
        }

        let Some(object) = self.get(id).cloned() else {
            return PointerOutcome::Ignored;
        };
        let decision = match object.kind {
            MarkKind::Signature => self.edit_handler.on_edit_signature(&object),
            MarkKind::Initial => self.edit_handler.on_edit_initial(&object),
        };
        match decision {
            EditDecision::Recapture | EditDecision::Delete => {
                self.remove(id);
            }
            EditDecision::Keep => {
                self.selected = Some(id);
            }
        }
        debug!(kind = %object.kind, ?id, ?decision, "mark edit requested");
        PointerOutcome::Edited(EditOutcome { object, decision })
    }

    fn update(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut Transform),
    ) -> Option<&AnnotationObject> {
        let object = self.get_mut(id)?;
        f(&mut object.transform);
        Some(object)
    }

    /// Move a mark by (`dx`, `dy`) canvas pixels.
    pub fn translate(&mut self, id: ObjectId, dx: f32, dy: f32) -> Option<&AnnotationObject> {
        self.update(id, |t| {
            t.left += dx;
            t.top += dy;
        })
    }

    pub fn set_scale(
        &mut self,
        id: ObjectId,
        scale_x: f32,
        scale_y: f32,
    ) -> Option<&AnnotationObject> {
        self.update(id, |t| {
            t.scale_x = scale_x;
            t.scale_y = scale_y;
        })
    }

    /// Set the absolute rotation in degrees.
    pub fn set_angle(&mut self, id: ObjectId, angle: f32) -> Option<&AnnotationObject> {
        self.update(id, |t| t.angle = angle)
    }

    pub fn set_transform(
        &mut self,
        id: ObjectId,
        transform: Transform,
    ) -> Option<&AnnotationObject> {
        self.update(id, |t| *t = transform)
    }

    /// Remove a placed mark. The background cannot be removed.
    pub fn remove(&mut self, id: ObjectId) -> Option<AnnotationObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.objects.remove(index))
    }

    /// Remove the selected mark, if any.
    pub fn delete_selected(&mut self) -> Option<AnnotationObject> {
        let id = self.selected?;
        let removed = self.remove(id);
        if let Some(object) = &removed {
            debug!(kind = %object.kind, ?id, "selected mark deleted");
        }
        removed
    }

    /// Flatten the canvas at `multiplier`, optionally over a solid fill.
    pub fn rasterize(
        &self,
        multiplier: f32,
        fill: Option<Rgba<u8>>,
    ) -> crate::error::Result<RgbaImage> {
        let background = self
            .background
            .as_ref()
            .ok_or_else(|| DocSignError::render("canvas has no background"))?;
        raster::flatten(background, &self.objects, multiplier, fill)
    }
}
