pub mod course_list;
pub mod dialog;
pub mod feed;
pub mod table;

pub use course_list::{CourseListController, WorkflowKind, WorkflowState, merge_feeds};
pub use dialog::{CourseDialog, DialogPrefill, SubmittedForm};
pub use feed::{FeedDelivery, FeedKind, FeedPoller, FeedSink, FeedSnapshot};
pub use table::{Column, SortDirection, SortState};
