use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::backend::CourseBackend;
use crate::error::AppError;
use crate::models::{Course, CourseWithSubject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Courses,
    CoursesWithSubject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSnapshot {
    Courses(Vec<Course>),
    CoursesWithSubject(Vec<CourseWithSubject>),
}

impl FeedSnapshot {
    pub fn kind(&self) -> FeedKind {
        match self {
            FeedSnapshot::Courses(_) => FeedKind::Courses,
            FeedSnapshot::CoursesWithSubject(_) => FeedKind::CoursesWithSubject,
        }
    }

    fn len(&self) -> usize {
        match self {
            FeedSnapshot::Courses(courses) => courses.len(),
            FeedSnapshot::CoursesWithSubject(courses) => courses.len(),
        }
    }
}

/// A full snapshot plus the moment its read was issued.
#[derive(Debug, Clone)]
pub struct FeedDelivery {
    pub snapshot: FeedSnapshot,
    pub requested_at: Instant,
}

/// Receiver of feed deliveries.
#[async_trait]
pub trait FeedSink: Send + Sync {
    async fn deliver(&self, delivery: FeedDelivery);
}

/// Turns one backend read into a stream of snapshots by polling.
pub struct FeedPoller {
    backend: Arc<dyn CourseBackend>,
    kind: FeedKind,
    interval: Duration,
}

impl FeedPoller {
    pub fn new(backend: Arc<dyn CourseBackend>, kind: FeedKind, interval: Duration) -> Self {
        Self {
            backend,
            kind,
            interval,
        }
    }

    pub async fn fetch(&self) -> Result<FeedDelivery, AppError> {
        let requested_at = Instant::now();
        let snapshot = match self.kind {
            FeedKind::Courses => FeedSnapshot::Courses(self.backend.list_courses().await?),
            FeedKind::CoursesWithSubject => {
                FeedSnapshot::CoursesWithSubject(self.backend.list_courses_with_subject().await?)
            }
        };
        Ok(FeedDelivery {
            snapshot,
            requested_at,
        })
    }

    /// Reads immediately, then once per interval. A failed read ends the feed.
    pub async fn start(self, sink: Arc<dyn FeedSink>) {
        info!("Subscribing to {:?} feed (interval: {:?})", self.kind, self.interval);

        loop {
            match self.fetch().await {
                Ok(delivery) => {
                    debug!("{:?} feed delivered {} courses", self.kind, delivery.snapshot.len());
                    sink.deliver(delivery).await;
                }
                Err(e) => {
                    error!("{:?} feed stopped: {}", self.kind, e);
                    return;
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
