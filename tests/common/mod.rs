#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use course_admin::backend::CourseBackend;
use course_admin::error::AppError;
use course_admin::models::{Course, CourseForm, CourseUpdate, CourseWithSubject, Subject};
use course_admin::services::{CourseDialog, DialogPrefill};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListCourses,
    ListCoursesWithSubject,
    Create(Course),
    Update(CourseUpdate),
    Delete(i64),
}

/// In-memory backend that records every call.
#[derive(Default)]
pub struct RecordingBackend {
    courses: Mutex<Vec<Course>>,
    calls: Mutex<Vec<Call>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordingBackend {
    pub fn with_courses(courses: Vec<Course>) -> Self {
        Self {
            courses: Mutex::new(courses),
            ..Default::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Create, update and delete calls only.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::ListCourses | Call::ListCoursesWithSubject))
            .collect()
    }

    pub fn stored(&self) -> Vec<Course> {
        self.courses.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn read_guard(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("read refused".to_string()));
        }
        Ok(())
    }

    fn write_guard(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("write refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CourseBackend for RecordingBackend {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.record(Call::ListCourses);
        self.read_guard()?;
        Ok(self.stored())
    }

    async fn list_courses_with_subject(&self) -> Result<Vec<CourseWithSubject>, AppError> {
        self.record(Call::ListCoursesWithSubject);
        self.read_guard()?;
        Ok(self
            .stored()
            .into_iter()
            .map(|course| CourseWithSubject {
                subject: course.subject_id.map(|id| Subject {
                    id,
                    nombre: format!("Materia {}", id),
                }),
                course,
            })
            .collect())
    }

    async fn create_course(&self, course: &Course) -> Result<(), AppError> {
        self.record(Call::Create(course.clone()));
        self.write_guard()?;
        self.courses.lock().unwrap().push(course.clone());
        Ok(())
    }

    async fn update_course(&self, update: &CourseUpdate) -> Result<(), AppError> {
        self.record(Call::Update(update.clone()));
        self.write_guard()?;
        let mut courses = self.courses.lock().unwrap();
        let course = courses
            .iter_mut()
            .find(|c| c.id == update.id)
            .ok_or(AppError::NotFound)?;
        course.subject_id = update.subject_id;
        course.fecha_inicio = update.fecha_inicio;
        course.fecha_fin = update.fecha_fin;
        Ok(())
    }

    async fn delete_course(&self, id: i64) -> Result<(), AppError> {
        self.record(Call::Delete(id));
        self.write_guard()?;
        self.courses.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}

/// Dialog that resolves immediately and remembers what it was opened with.
pub struct ScriptedDialog {
    result: Option<CourseForm>,
    opened_with: Mutex<Vec<Option<DialogPrefill>>>,
}

impl ScriptedDialog {
    pub fn confirming(form: CourseForm) -> Self {
        Self {
            result: Some(form),
            opened_with: Mutex::new(Vec::new()),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            result: None,
            opened_with: Mutex::new(Vec::new()),
        }
    }

    pub fn opened_with(&self) -> Vec<Option<DialogPrefill>> {
        self.opened_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl CourseDialog for ScriptedDialog {
    async fn open(&self, prefill: Option<DialogPrefill>) -> Option<CourseForm> {
        self.opened_with.lock().unwrap().push(prefill);
        self.result.clone()
    }
}

/// Dialog that stays open until `release` is called.
pub struct HeldDialog {
    form: CourseForm,
    release: Notify,
}

impl HeldDialog {
    pub fn new(form: CourseForm) -> Self {
        Self {
            form,
            release: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl CourseDialog for HeldDialog {
    async fn open(&self, _prefill: Option<DialogPrefill>) -> Option<CourseForm> {
        self.release.notified().await;
        Some(self.form.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn course(id: i64, nombre: &str) -> Course {
    Course {
        id,
        nombre: Some(nombre.to_string()),
        fecha_inicio: date(2023, 3, id as u32),
        fecha_fin: date(2023, 9, id as u32),
        subject_id: Some(id * 10),
    }
}

pub fn form(nombre: &str) -> CourseForm {
    CourseForm {
        nombre: Some(nombre.to_string()),
        fecha_inicio: date(2024, 4, 1),
        fecha_fin: date(2024, 7, 31),
        subject_id: Some(3),
    }
}

pub fn seed() -> Vec<Course> {
    vec![
        course(1, "Angular"),
        course(2, "React"),
        course(3, "Rust"),
    ]
}
