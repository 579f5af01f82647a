use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{Course, CourseUpdate, CourseWithSubject};

/// Remote course service. Reads return one full snapshot each; the feed
/// pollers turn repeated reads into a stream.
#[async_trait]
pub trait CourseBackend: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn list_courses_with_subject(&self) -> Result<Vec<CourseWithSubject>, AppError>;
    async fn create_course(&self, course: &Course) -> Result<(), AppError>;
    async fn update_course(&self, update: &CourseUpdate) -> Result<(), AppError>;
    async fn delete_course(&self, id: i64) -> Result<(), AppError>;
}

/// json-server style REST backend.
pub struct HttpCourseBackend {
    client: Client,
    base_url: String,
}

impl HttpCourseBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn courses_url(&self) -> String {
        format!("{}/cursos", self.base_url)
    }

    fn course_url(&self, id: i64) -> String {
        format!("{}/cursos/{}", self.base_url, id)
    }

    async fn check(response: Response, action: &str) -> Result<Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upstream(format!("{} failed: {} {}", action, status, body)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, action: &str) -> Result<T, AppError> {
        let response = self.client.get(url).send().await?;
        let response = Self::check(response, action).await?;
        let body_text = response.text().await?;

        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", action, e);
            AppError::Upstream(format!("Failed to parse {} response: {}", action, e))
        })
    }
}

#[async_trait]
impl CourseBackend for HttpCourseBackend {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.get_json(&self.courses_url(), "list courses").await
    }

    async fn list_courses_with_subject(&self) -> Result<Vec<CourseWithSubject>, AppError> {
        let url = format!("{}?_expand=subject", self.courses_url());
        self.get_json(&url, "list courses with subject").await
    }

    async fn create_course(&self, course: &Course) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.courses_url())
            .json(course)
            .send()
            .await?;
        Self::check(response, "create course").await?;
        Ok(())
    }

    async fn update_course(&self, update: &CourseUpdate) -> Result<(), AppError> {
        let response = self
            .client
            .patch(self.course_url(update.id))
            .json(update)
            .send()
            .await?;
        Self::check(response, "update course").await?;
        Ok(())
    }

    async fn delete_course(&self, id: i64) -> Result<(), AppError> {
        let response = self.client.delete(self.course_url(id)).send().await?;
        Self::check(response, "delete course").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let backend = HttpCourseBackend::new("http://localhost:3000/").expect("client builds");
        assert_eq!(backend.courses_url(), "http://localhost:3000/cursos");
        assert_eq!(backend.course_url(12), "http://localhost:3000/cursos/12");
    }
}
