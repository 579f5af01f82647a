use async_trait::async_trait;

use crate::models::{Course, CourseForm, CourseWithSubject};

/// What the edit form is pre-filled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPrefill {
    Curso(Course),
    CursoWithSubject(CourseWithSubject),
}

/// Modal create/edit form. Resolves to the confirmed payload, or `None`
/// when the user cancels.
#[async_trait]
pub trait CourseDialog: Send + Sync {
    async fn open(&self, prefill: Option<DialogPrefill>) -> Option<CourseForm>;
}

/// A dialog whose outcome is already known, e.g. a form body posted by a
/// browser front-end.
pub struct SubmittedForm(pub Option<CourseForm>);

#[async_trait]
impl CourseDialog for SubmittedForm {
    async fn open(&self, _prefill: Option<DialogPrefill>) -> Option<CourseForm> {
        self.0.clone()
    }
}
