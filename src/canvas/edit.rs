// Edit capability invoked on double click of a placed mark

use super::object::AnnotationObject;
use crate::mark::MarkKind;

/// What to do with a mark the user asked to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDecision {
    /// Remove the mark and re-enter its capture flow.
    Recapture,
    /// Remove the mark.
    Delete,
    /// Leave the mark in place.
    Keep,
}

/// Decides how an edit request on a placed mark is handled.
pub trait EditHandler {
    fn on_edit_signature(&mut self, object: &AnnotationObject) -> EditDecision;
    fn on_edit_initial(&mut self, object: &AnnotationObject) -> EditDecision;
}

/// Fallback when the caller supplies no handler: always re-capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEditPolicy;

impl EditHandler for DefaultEditPolicy {
    fn on_edit_signature(&mut self, _object: &AnnotationObject) -> EditDecision {
        EditDecision::Recapture
    }

    fn on_edit_initial(&mut self, _object: &AnnotationObject) -> EditDecision {
        EditDecision::Recapture
    }
}

/// Asks a yes/no question per edit: `true` re-captures, `false` deletes.
pub struct ConfirmEditPolicy<F>
where
    F: FnMut(MarkKind) -> bool,
{
    confirm: F,
}

impl<F> ConfirmEditPolicy<F>
where
    F: FnMut(MarkKind) -> bool,
{
    pub fn new(confirm: F) -> Self {
        Self { confirm }
    }

    fn decide(&mut self, kind: MarkKind) -> EditDecision {
        if (self.confirm)(kind) {
            EditDecision::Recapture
        } else {
            EditDecision::Delete
        }
    }
}

impl<F> EditHandler for ConfirmEditPolicy<F>
where
    F: FnMut(MarkKind) -> bool,
{
    fn on_edit_signature(&mut self, object: &AnnotationObject) -> EditDecision {
        self.decide(object.kind())
    }

    fn on_edit_initial(&mut self, object: &AnnotationObject) -> EditDecision {
        self.decide(object.kind())
    }
}
