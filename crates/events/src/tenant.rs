use stockpost_core::TenantId;

use crate::NotificationEnvelope;

/// Helper trait for tenant-scoped messages.
///
/// Lets subscribers (real-time broadcasters, cache invalidators) filter a shared
/// bus down to the tenant they serve.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for NotificationEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}
