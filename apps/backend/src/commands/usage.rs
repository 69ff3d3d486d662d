//! # Usage Commands
//!
//! What the billing screen shows: free invoices left, the current plan, and
//! whether the next invoice will be allowed.

use tracing::debug;

use crate::error::ApiError;
use crate::state::{BillingState, ConfigState};
use kanak_core::EntitlementSnapshot;

/// Current entitlement of the configured account.
///
/// When usage accounting cannot be reached the snapshot is permissive and
/// flagged `degraded`.
pub async fn get_entitlement(
    config: &ConfigState,
    billing: &BillingState,
) -> Result<EntitlementSnapshot, ApiError> {
    debug!("get_entitlement command");
    Ok(billing.entitlements().check(config.account_id()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use crate::Backend;

    #[tokio::test]
    async fn test_fresh_account_has_full_allowance() {
        let app = Backend::in_memory(AppConfig::default()).await.unwrap();
        let snapshot = get_entitlement(&app.config, &app.billing).await.unwrap();

        assert!(snapshot.can_create_invoice);
        assert_eq!(snapshot.free_invoices_used, 0);
        assert_eq!(snapshot.free_invoices_remaining, 3);
        assert!(!snapshot.subscription_active);
        assert!(!snapshot.degraded);
    }

    #[tokio::test]
    async fn test_closed_database_fails_open() {
        let app = Backend::in_memory(AppConfig::default()).await.unwrap();
        app.shutdown().await;

        let snapshot = get_entitlement(&app.config, &app.billing).await.unwrap();
        assert!(snapshot.can_create_invoice);
        assert!(snapshot.degraded);
    }
}
