use std::sync::Arc;

use crate::services::CourseListController;

#[derive(Clone)]
pub struct AppState {
    pub courses: Arc<CourseListController>,
}
