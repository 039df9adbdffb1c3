//! Initial (paraf) synchronization across pages.
//!
//! Each placed initial is tracked by its [`MarkId`]: the transform it had at
//! placement plus one delta describing how far it has since been moved,
//! scaled or rotated. Every page shown afterwards gets a copy at
//! `origin + delta`, so all copies of a mark share one global delta.

pub mod page_range;

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, trace};

use crate::canvas::CompositionCanvas;
use crate::canvas::object::{AnnotationObject, MarkId, ObjectId, Transform};
use crate::mark::MarkKind;
pub use page_range::{PageRangeSelection, parse_page_range};

/// Difference between a live transform and its placement origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformDelta {
    pub dx: f32,
    pub dy: f32,
    pub d_scale_x: f32,
    pub d_scale_y: f32,
    pub d_angle: f32,
}

/// Which part of an interactive manipulation produced a transform update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformEvent {
    Moving,
    Scaling,
    Rotating,
}

#[derive(Debug, Clone)]
pub struct SyncRecord {
    origin: Transform,
    delta: TransformDelta,
    image: Arc<RgbaImage>,
}

impl SyncRecord {
    pub fn origin(&self) -> Transform {
        self.origin
    }

    pub fn delta(&self) -> TransformDelta {
        self.delta
    }

    /// Transform a reproduced copy gets.
    pub fn current(&self) -> Transform {
        apply_delta(self.origin, self.delta)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// `live - origin`, component-wise.
pub fn delta_between(origin: Transform, live: Transform) -> TransformDelta {
    TransformDelta {
        dx: live.left - origin.left,
        dy: live.top - origin.top,
        d_scale_x: live.scale_x - origin.scale_x,
        d_scale_y: live.scale_y - origin.scale_y,
        d_angle: live.angle - origin.angle,
    }
}

/// `origin + delta`, component-wise.
pub fn apply_delta(origin: Transform, delta: TransformDelta) -> Transform {
    Transform {
        left: origin.left + delta.dx,
        top: origin.top + delta.dy,
        scale_x: origin.scale_x + delta.d_scale_x,
        scale_y: origin.scale_y + delta.d_scale_y,
        angle: origin.angle + delta.d_angle,
    }
}

/// A copy to add to a freshly shown page.
#[derive(Debug, Clone)]
pub struct Reproduction {
    pub mark_id: MarkId,
    pub transform: Transform,
    pub image: Arc<RgbaImage>,
}

#[derive(Debug, Default)]
pub struct InitialSyncEngine {
    records: BTreeMap<MarkId, SyncRecord>,
}

impl InitialSyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly placed initial with zero delta.
    ///
    /// Signatures and objects without a [`MarkId`] are ignored; a mark that is
    /// already registered keeps its original origin.
    pub fn on_place(&mut self, object: &AnnotationObject) {
        let Some(mark_id) = object.mark_id() else {
            return;
        };
        if object.kind() != MarkKind::Initial || self.records.contains_key(&mark_id) {
            return;
        }
        debug!(?mark_id, origin = ?object.transform(), "initial registered for sync");
        self.records.insert(
            mark_id,
            SyncRecord {
                origin: object.transform(),
                delta: TransformDelta::default(),
                image: object.shared_image(),
            },
        );
    }

    /// Update the record of `object` from its live transform.
    ///
    /// Moving refreshes the whole delta; scaling and rotating refresh only
    /// their own components.
    pub fn on_transform(&mut self, object: &AnnotationObject, event: TransformEvent) {
        let Some(record) = object.mark_id().and_then(|id| self.records.get_mut(&id)) else {
            return;
        };
        let live = delta_between(record.origin, object.transform());
        match event {
            TransformEvent::Moving => record.delta = live,
            TransformEvent::Scaling => {
                record.delta.d_scale_x = live.d_scale_x;
                record.delta.d_scale_y = live.d_scale_y;
            }
            TransformEvent::Rotating => record.delta.d_angle = live.d_angle,
        }
        trace!(mark_id = ?object.mark_id(), ?event, delta = ?record.delta, "sync delta updated");
    }

    /// Copies due on `page_index`; empty when the selection excludes it.
    pub fn reproductions(&self, page_index: u32, selection: &PageRangeSelection) -> Vec<Reproduction> {
        if !selection.includes(page_index) {
            return Vec::new();
        }
        self.records
            .iter()
            .map(|(&mark_id, record)| Reproduction {
                mark_id,
                transform: record.current(),
                image: Arc::clone(&record.image),
            })
            .collect()
    }

    /// Add every due copy to `canvas`, which must already show `page_index`.
    pub fn reproduce_on(
        &self,
        canvas: &mut CompositionCanvas,
        page_index: u32,
        selection: &PageRangeSelection,
    ) -> Vec<ObjectId> {
        let ids: Vec<ObjectId> = self
            .reproductions(page_index, selection)
            .into_iter()
            .filter_map(|r| {
                canvas.add_reproduction(MarkKind::Initial, r.image, r.transform, Some(r.mark_id))
            })
            .collect();
        if !ids.is_empty() {
            debug!(page = page_index, count = ids.len(), "initials reproduced");
        }
        ids
    }

    pub fn record(&self, mark_id: MarkId) -> Option<&SyncRecord> {
        self.records.get(&mark_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record (new document).
    pub fn reset(&mut self) {
        self.records.clear();
    }
}
