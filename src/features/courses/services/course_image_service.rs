use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::Result;
use crate::features::courses::dtos::{CourseImageUpload, CourseResponseDto};
use crate::features::courses::services::CourseService;
use crate::modules::storage::MinIOClient;

/// Course cover images kept in object storage
pub struct CourseImageService {
    courses: Arc<CourseService>,
    storage: Arc<MinIOClient>,
}

impl CourseImageService {
    pub fn new(courses: Arc<CourseService>, storage: Arc<MinIOClient>) -> Self {
        Self { courses, storage }
    }

    /// Store `upload` and make it the course cover, replacing any previous one.
    pub async fn upload(
        &self,
        actor: Uuid,
        course_id: Uuid,
        upload: CourseImageUpload,
    ) -> Result<CourseResponseDto> {
        let extension = upload.check()?;
        // 404 before anything reaches the bucket
        self.courses.get(course_id).await?;

        let key = self
            .storage
            .public_key(&format!("courses/{}/{}.{}", course_id, Uuid::new_v4(), extension));
        self.storage
            .upload(&key, &upload.data, &upload.content_type)
            .await?;

        let url = self.storage.public_url(&key);
        match self
            .courses
            .set_image(actor, course_id, Some((key.clone(), url)))
            .await
        {
            Ok((course, previous)) => {
                if let Some(previous) = previous {
                    self.discard(&previous).await;
                }
                Ok(course)
            }
            Err(e) => {
                self.discard(&key).await;
                Err(e)
            }
        }
    }

    /// Clear the cover image
    pub async fn remove(&self, actor: Uuid, course_id: Uuid) -> Result<CourseResponseDto> {
        let (course, previous) = self.courses.set_image(actor, course_id, None).await?;
        if let Some(previous) = previous {
            self.discard(&previous).await;
        }
        Ok(course)
    }

    /// An orphaned object is not worth failing the request over
    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!("Failed to delete stale course image '{}': {}", key, e);
        }
    }
}
