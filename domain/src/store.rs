//! Timeouts around every call into the Store Adapter.
//!
//! A store call that overruns surfaces as [`InternalErrorKind::Timeout`] so the
//! caller never caches or returns a partial result.
//!
//! [`InternalErrorKind::Timeout`]: crate::error::InternalErrorKind::Timeout

use crate::error::Error;
use entity_api::error::Error as EntityApiError;
use log::*;
use service::AppState;
use std::future::Future;
use std::time::Duration;

pub(crate) async fn read<T>(
    app_state: &AppState,
    operation: impl Future<Output = Result<T, EntityApiError>>,
) -> Result<T, Error> {
    bounded(app_state.config.store_read_timeout(), "read", operation).await
}

pub(crate) async fn write<T>(
    app_state: &AppState,
    operation: impl Future<Output = Result<T, EntityApiError>>,
) -> Result<T, Error> {
    bounded(app_state.config.store_write_timeout(), "write", operation).await
}

async fn bounded<T>(
    limit: Duration,
    kind: &str,
    operation: impl Future<Output = Result<T, EntityApiError>>,
) -> Result<T, Error> {
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            if err.error_kind == entity_api::error::EntityApiErrorKind::SystemError {
                error!("Store {kind} failed: {err}");
            }
            Err(err.into())
        }
        Err(_) => {
            error!("Store {kind} timed out after {}ms", limit.as_millis());
            Err(Error::timeout())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use entity_api::error::EntityApiErrorKind;

    #[tokio::test]
    async fn slow_operations_time_out() {
        let result: Result<(), Error> = bounded(Duration::from_millis(5), "read", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Timeout)
        );
    }

    #[tokio::test]
    async fn store_errors_are_translated() {
        let result: Result<(), Error> = bounded(Duration::from_secs(1), "write", async {
            Err(EntityApiError {
                source: None,
                error_kind: EntityApiErrorKind::RecordNotFound,
            })
        })
        .await;

        assert!(matches!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(_))
        ));
    }

    #[tokio::test]
    async fn fast_operations_pass_through() {
        let value = bounded(Duration::from_secs(1), "read", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
