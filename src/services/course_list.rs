use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::backend::CourseBackend;
use crate::error::AppError;
use crate::models::{
    Course, CourseRow, CourseUpdate, CourseWithSubject, PendingCourse,
};
use crate::services::dialog::{CourseDialog, DialogPrefill};
use crate::services::feed::{FeedDelivery, FeedKind, FeedPoller, FeedSink, FeedSnapshot};
use crate::services::table::{self, Column, SortState};

/// Displayed collection from the latest snapshot of each feed.
///
/// The subject-enriched feed wins once it has delivered; until then the
/// plain feed is shown. Pending rows are appended unless their provisional
/// id is already taken.
pub fn merge_feeds(
    plain: Option<&[Course]>,
    with_subject: Option<&[CourseWithSubject]>,
    pending: &[PendingCourse],
) -> Vec<CourseRow> {
    let mut rows: Vec<CourseRow> = match (with_subject, plain) {
        (Some(enriched), _) => enriched.iter().cloned().map(CourseRow::from).collect(),
        (None, Some(plain)) => plain.iter().cloned().map(CourseRow::from).collect(),
        (None, None) => Vec::new(),
    };

    let mut taken: HashSet<i64> = rows.iter().map(CourseRow::id).collect();
    for entry in pending {
        if taken.insert(entry.course.id) {
            rows.push(CourseRow::from(entry.clone()));
        }
    }
    rows
}

#[derive(Debug, Clone)]
struct PendingEntry {
    pending: PendingCourse,
    confirmed_at: Instant,
}

#[derive(Debug, Default)]
pub struct CourseListState {
    plain: Option<Vec<Course>>,
    with_subject: Option<Vec<CourseWithSubject>>,
    pending: Vec<PendingEntry>,
    rows: Vec<CourseRow>,
    filter: String,
    sort: SortState,
}

impl CourseListState {
    pub fn rows(&self) -> &[CourseRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> Vec<CourseRow> {
        table::visible_rows(&self.rows, &self.filter, &self.sort)
    }

    fn displayed_feed(&self) -> Option<FeedKind> {
        if self.with_subject.is_some() {
            Some(FeedKind::CoursesWithSubject)
        } else if self.plain.is_some() {
            Some(FeedKind::Courses)
        } else {
            None
        }
    }

    pub fn apply(&mut self, delivery: FeedDelivery) {
        let kind = delivery.snapshot.kind();
        match delivery.snapshot {
            FeedSnapshot::Courses(courses) => self.plain = Some(courses),
            FeedSnapshot::CoursesWithSubject(courses) => self.with_subject = Some(courses),
        }

        // Only a read of the feed on screen supersedes locally created rows.
        if self.displayed_feed() == Some(kind) {
            self.pending
                .retain(|entry| entry.confirmed_at > delivery.requested_at);
        }
        self.rebuild();
    }

    fn add_pending(&mut self, pending: PendingCourse, confirmed_at: Instant) {
        self.pending.push(PendingEntry {
            pending,
            confirmed_at,
        });
        self.rebuild();
    }

    /// Drops every record with `id`; returns how many displayed rows went away.
    fn remove(&mut self, id: i64) -> usize {
        let before = self.rows.len();
        if let Some(plain) = self.plain.as_mut() {
            plain.retain(|c| c.id != id);
        }
        if let Some(enriched) = self.with_subject.as_mut() {
            enriched.retain(|c| c.course.id != id);
        }
        self.pending.retain(|entry| entry.pending.course.id != id);
        self.rebuild();
        before - self.rows.len()
    }

    fn rebuild(&mut self) {
        let pending: Vec<PendingCourse> =
            self.pending.iter().map(|entry| entry.pending.clone()).collect();
        self.rows = merge_feeds(
            self.plain.as_deref(),
            self.with_subject.as_deref(),
            &pending,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Create,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    FormOpen(WorkflowKind),
    Persisting(WorkflowKind),
}

/// Returns the dialog workflow to `Idle` however the workflow ends.
struct WorkflowGuard<'a> {
    slot: &'a Mutex<WorkflowState>,
    kind: WorkflowKind,
}

impl<'a> WorkflowGuard<'a> {
    fn begin(slot: &'a Mutex<WorkflowState>, kind: WorkflowKind) -> Result<Self, AppError> {
        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != WorkflowState::Idle {
            return Err(AppError::Conflict(format!(
                "a course form is already open ({:?})",
                *state
            )));
        }
        *state = WorkflowState::FormOpen(kind);
        Ok(Self { slot, kind })
    }

    fn persisting(&self) {
        let mut state = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *state = WorkflowState::Persisting(self.kind);
    }
}

impl Drop for WorkflowGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *state = WorkflowState::Idle;
    }
}

struct Shared {
    state: RwLock<CourseListState>,
    changes: watch::Sender<u64>,
}

impl Shared {
    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }
}

#[async_trait]
impl FeedSink for Shared {
    async fn deliver(&self, delivery: FeedDelivery) {
        self.state.write().await.apply(delivery);
        self.notify();
    }
}

#[derive(Default)]
struct Subscriptions {
    courses: Option<JoinHandle<()>>,
    with_subject: Option<JoinHandle<()>>,
}

/// Owns the course table: feeds in, filter and sort, and the
/// create/edit/delete workflows out to the backend.
pub struct CourseListController {
    backend: Arc<dyn CourseBackend>,
    shared: Arc<Shared>,
    feed_interval: Duration,
    subscriptions: Mutex<Subscriptions>,
    workflow: Mutex<WorkflowState>,
}

impl CourseListController {
    pub fn new(backend: Arc<dyn CourseBackend>, feed_interval: Duration) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            backend,
            shared: Arc::new(Shared {
                state: RwLock::new(CourseListState::default()),
                changes,
            }),
            feed_interval,
            subscriptions: Mutex::new(Subscriptions::default()),
            workflow: Mutex::new(WorkflowState::Idle),
        }
    }

    /// Subscribes to both feeds. Must run inside a tokio runtime.
    pub fn initialize(&self) {
        self.teardown();

        let sink: Arc<dyn FeedSink> = self.shared.clone();
        let courses = FeedPoller::new(self.backend.clone(), FeedKind::Courses, self.feed_interval);
        let with_subject = FeedPoller::new(
            self.backend.clone(),
            FeedKind::CoursesWithSubject,
            self.feed_interval,
        );

        let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subs.courses = Some(tokio::spawn(courses.start(sink.clone())));
        subs.with_subject = Some(tokio::spawn(with_subject.start(sink)));
        info!("Course list initialized");
    }

    /// Releases the feed subscriptions. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in [subs.courses.take(), subs.with_subject.take()].into_iter().flatten() {
            handle.abort();
            debug!("Feed subscription released");
        }
    }

    /// One immediate read of both feeds, plain first.
    pub async fn refresh(&self) -> Result<(), AppError> {
        for kind in [FeedKind::Courses, FeedKind::CoursesWithSubject] {
            let delivery = FeedPoller::new(self.backend.clone(), kind, self.feed_interval)
                .fetch()
                .await?;
            self.shared.deliver(delivery).await;
        }
        Ok(())
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    pub fn workflow_state(&self) -> WorkflowState {
        *self.workflow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn rows(&self) -> Vec<CourseRow> {
        self.shared.state.read().await.rows().to_vec()
    }

    pub async fn visible_rows(&self) -> Vec<CourseRow> {
        self.shared.state.read().await.visible_rows()
    }

    pub async fn find_row(&self, id: i64) -> Option<CourseRow> {
        self.shared
            .state
            .read()
            .await
            .rows()
            .iter()
            .find(|row| row.id() == id)
            .cloned()
    }

    /// Sets the normalized filter and returns the visible rows.
    pub async fn filter(&self, text: &str) -> Vec<CourseRow> {
        let mut state = self.shared.state.write().await;
        state.filter = table::normalize_filter(text);
        state.visible_rows()
    }

    pub async fn toggle_sort(&self, column: Column) -> Vec<CourseRow> {
        let mut state = self.shared.state.write().await;
        state.sort.toggle(column);
        state.visible_rows()
    }

    /// Create workflow. `Ok(None)` means the dialog was cancelled; on success
    /// the returned local key identifies the row until a read confirms it.
    pub async fn open_create(
        &self,
        dialog: &dyn CourseDialog,
    ) -> Result<Option<PendingCourse>, AppError> {
        let guard = WorkflowGuard::begin(&self.workflow, WorkflowKind::Create)?;

        let Some(form) = dialog.open(None).await else {
            debug!("Create course cancelled");
            return Ok(None);
        };
        guard.persisting();

        let id = {
            let state = self.shared.state.read().await;
            let id = state.rows().len() as i64 + 1;
            if state.rows().iter().any(|row| row.id() == id) {
                warn!("Provisional id {} is already displayed", id);
            }
            id
        };
        let course = form.into_course(id);

        match self.backend.create_course(&course).await {
            Ok(()) => {
                let pending = PendingCourse::new(course);
                self.shared
                    .state
                    .write()
                    .await
                    .add_pending(pending.clone(), Instant::now());
                self.shared.notify();
                info!("Created course {} ({})", pending.course.id, pending.local_key);
                Ok(Some(pending))
            }
            Err(e) => {
                error!("Failed to create course {}: {}", course.id, e);
                Err(e)
            }
        }
    }

    /// Edit workflow for `row`. `Ok(None)` means the dialog was cancelled.
    pub async fn open_edit(
        &self,
        row: &CourseRow,
        dialog: &dyn CourseDialog,
    ) -> Result<Option<CourseUpdate>, AppError> {
        let guard = WorkflowGuard::begin(&self.workflow, WorkflowKind::Edit)?;

        let prefill = match &row.subject {
            Some(subject) => DialogPrefill::CursoWithSubject(CourseWithSubject {
                course: row.course.clone(),
                subject: Some(subject.clone()),
            }),
            None => DialogPrefill::Curso(row.course.clone()),
        };

        let Some(form) = dialog.open(Some(prefill)).await else {
            debug!("Edit of course {} cancelled", row.id());
            return Ok(None);
        };
        guard.persisting();

        let update = CourseUpdate::from_form(row.id(), &form);
        match self.backend.update_course(&update).await {
            Ok(()) => {
                info!("Updated course {}", update.id);
                Ok(Some(update))
            }
            Err(e) => {
                error!("Failed to update course {}: {}", update.id, e);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        match self.backend.delete_course(id).await {
            Ok(()) => {
                let removed = self.shared.state.write().await.remove(id);
                self.shared.notify();
                info!("Deleted course {} ({} rows removed)", id, removed);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete course {}: {}", id, e);
                Err(e)
            }
        }
    }
}

impl Drop for CourseListController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Subject;

    fn course(id: i64, nombre: &str) -> Course {
        Course {
            id,
            nombre: Some(nombre.to_string()),
            fecha_inicio: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            fecha_fin: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            subject_id: Some(1),
        }
    }

    fn enriched(id: i64, nombre: &str) -> CourseWithSubject {
        CourseWithSubject {
            course: course(id, nombre),
            subject: Some(Subject {
                id: 1,
                nombre: "Programacion".to_string(),
            }),
        }
    }

    fn delivery(snapshot: FeedSnapshot, requested_at: Instant) -> FeedDelivery {
        FeedDelivery {
            snapshot,
            requested_at,
        }
    }

    fn ids(rows: &[CourseRow]) -> Vec<i64> {
        rows.iter().map(CourseRow::id).collect()
    }

    #[test]
    fn test_merge_precedence() {
        let plain = vec![course(1, "A"), course(2, "B")];
        let rich = vec![enriched(3, "C")];

        assert!(merge_feeds(None, None, &[]).is_empty());
        assert_eq!(ids(&merge_feeds(Some(&plain), None, &[])), vec![1, 2]);

        let merged = merge_feeds(Some(&plain), Some(&rich), &[]);
        assert_eq!(ids(&merged), vec![3]);
        assert!(merged[0].subject.is_some());
    }

    #[test]
    fn test_merge_skips_pending_with_taken_id() {
        let plain = vec![course(1, "A"), course(3, "C")];
        let pending = vec![
            PendingCourse::new(course(3, "guess")),
            PendingCourse::new(course(4, "new")),
        ];

        let merged = merge_feeds(Some(&plain), None, &pending);
        assert_eq!(ids(&merged), vec![1, 3, 4]);
        assert_eq!(merged[1].course.nombre.as_deref(), Some("C"));
        assert!(merged[2].pending);
    }

    #[test]
    fn test_plain_delivery_after_subject_feed_changes_nothing() {
        let mut state = CourseListState::default();
        let now = Instant::now();

        state.apply(delivery(FeedSnapshot::CoursesWithSubject(vec![enriched(1, "A")]), now));
        state.apply(delivery(FeedSnapshot::Courses(vec![course(5, "X"), course(6, "Y")]), now));

        assert_eq!(ids(state.rows()), vec![1]);
    }

    #[test]
    fn test_pending_cleared_only_by_later_read_of_displayed_feed() {
        let mut state = CourseListState::default();
        let before = Instant::now();
        state.apply(delivery(FeedSnapshot::CoursesWithSubject(vec![enriched(1, "A")]), before));

        let confirmed_at = before + Duration::from_secs(1);
        state.add_pending(PendingCourse::new(course(2, "new")), confirmed_at);
        assert_eq!(ids(state.rows()), vec![1, 2]);

        // read issued before the create was confirmed
        state.apply(delivery(FeedSnapshot::CoursesWithSubject(vec![enriched(1, "A")]), before));
        assert_eq!(ids(state.rows()), vec![1, 2]);

        // plain feed is not on screen
        let later = confirmed_at + Duration::from_secs(1);
        state.apply(delivery(FeedSnapshot::Courses(vec![course(1, "A")]), later));
        assert_eq!(ids(state.rows()), vec![1, 2]);

        state.apply(delivery(
            FeedSnapshot::CoursesWithSubject(vec![enriched(1, "A"), enriched(7, "new")]),
            later,
        ));
        assert_eq!(ids(state.rows()), vec![1, 7]);
        assert!(state.rows().iter().all(|row| !row.pending));
    }

    #[test]
    fn test_remove_drops_from_every_source() {
        let mut state = CourseListState::default();
        let now = Instant::now();
        state.apply(delivery(FeedSnapshot::Courses(vec![course(1, "A"), course(2, "B")]), now));
        state.add_pending(PendingCourse::new(course(3, "C")), now + Duration::from_secs(1));

        assert_eq!(state.remove(2), 1);
        assert_eq!(state.remove(3), 1);
        assert_eq!(state.remove(42), 0);
        assert_eq!(ids(state.rows()), vec![1]);
    }

    #[test]
    fn test_workflow_guard_resets_to_idle() {
        let slot = Mutex::new(WorkflowState::Idle);
        {
            let guard = WorkflowGuard::begin(&slot, WorkflowKind::Edit).expect("idle");
            assert_eq!(*slot.lock().unwrap(), WorkflowState::FormOpen(WorkflowKind::Edit));
            assert!(matches!(
                WorkflowGuard::begin(&slot, WorkflowKind::Create),
                Err(AppError::Conflict(_))
            ));
            guard.persisting();
            assert_eq!(*slot.lock().unwrap(), WorkflowState::Persisting(WorkflowKind::Edit));
        }
        assert_eq!(*slot.lock().unwrap(), WorkflowState::Idle);
    }
}
