pub mod course;
pub mod person;

pub use course::{Course, CourseForm, CourseRow, CourseUpdate, CourseWithSubject, PendingCourse, Subject};
pub use person::Person;
