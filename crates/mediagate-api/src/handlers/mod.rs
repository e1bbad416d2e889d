pub mod auth;
pub mod exif;
pub mod health;
pub mod media;
pub mod notify;
pub mod openapi;
pub mod profile;
pub mod video;

use std::future::Future;
use std::time::Duration;

use mediagate_core::AppError;

/// Await a collaborator call for at most `deadline`.
///
/// Expiry drops the pending future and surfaces as a 504.
pub async fn with_deadline<T, F>(
    operation: &'static str,
    deadline: Duration,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                deadline_ms = deadline.as_millis() as u64,
                "Collaborator call exceeded its deadline"
            );
            Err(AppError::timeout(operation, deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expiry_is_timeout() {
        let result: Result<(), AppError> = with_deadline(
            "slow lookup",
            Duration::from_millis(20),
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Timeout { ref operation, .. }) if operation == "slow lookup"));
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok = with_deadline("fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<(), AppError> = with_deadline("fast", Duration::from_secs(1), async {
            Err(AppError::NotFound("gone".into()))
        })
        .await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }
}
