use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(with = "date_format")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "date_format")]
    pub fecha_fin: NaiveDate,
    #[serde(rename = "subjectId", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
}

/// Read model returned by the backend when the subject relation is expanded.
/// Courses without a `subjectId` come back with no `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseWithSubject {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
}

/// Payload the edit dialog resolves to once the user confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseForm {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(with = "date_format")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "date_format")]
    pub fecha_fin: NaiveDate,
    #[serde(rename = "subjectId", default)]
    pub subject_id: Option<i64>,
}

impl CourseForm {
    pub fn into_course(self, id: i64) -> Course {
        Course {
            id,
            nombre: self.nombre,
            fecha_inicio: self.fecha_inicio,
            fecha_fin: self.fecha_fin,
            subject_id: self.subject_id,
        }
    }
}

/// Update payload. Carries no `nombre`: edits never rename a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseUpdate {
    pub id: i64,
    #[serde(rename = "subjectId")]
    pub subject_id: Option<i64>,
    #[serde(with = "date_format")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "date_format")]
    pub fecha_fin: NaiveDate,
}

impl CourseUpdate {
    pub fn from_form(id: i64, form: &CourseForm) -> Self {
        Self {
            id,
            subject_id: form.subject_id,
            fecha_inicio: form.fecha_inicio,
            fecha_fin: form.fecha_fin,
        }
    }
}

/// One row of the course table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRow {
    #[serde(flatten)]
    pub course: Course,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    pub pending: bool,
    /// Local key of a row not yet confirmed by a read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_key: Option<Uuid>,
}

impl CourseRow {
    pub fn id(&self) -> i64 {
        self.course.id
    }
}

impl From<Course> for CourseRow {
    fn from(course: Course) -> Self {
        Self {
            course,
            subject: None,
            pending: false,
            pending_key: None,
        }
    }
}

impl From<CourseWithSubject> for CourseRow {
    fn from(value: CourseWithSubject) -> Self {
        Self {
            course: value.course,
            subject: value.subject,
            pending: false,
            pending_key: None,
        }
    }
}

/// A course created locally whose id has not been confirmed by a later read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCourse {
    pub local_key: Uuid,
    #[serde(flatten)]
    pub course: Course,
}

impl PendingCourse {
    pub fn new(course: Course) -> Self {
        Self { local_key: Uuid::new_v4(), course }
    }
}

impl From<PendingCourse> for CourseRow {
    fn from(value: PendingCourse) -> Self {
        Self {
            course: value.course,
            subject: None,
            pending: true,
            pending_key: Some(value.local_key),
        }
    }
}

/// Dates go out as `YYYY-MM-DD`. Reads also accept RFC 3339 timestamps,
/// which is how browser `Date` values end up stored.
pub mod date_format {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, FORMAT).ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
    }
}
