//! 生命周期钩子：外部连接与作用域释放

use async_trait::async_trait;

/// Boxed error returned by connectors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A singleton that holds a connection to something outside the process.
///
/// Registrations marked with `ServiceDescriptor::connects` are resolved and
/// connected by `ServiceContainer::initialize`, and disconnected by
/// `ServiceContainer::shutdown`.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Human readable resource name used in logs and errors.
    fn resource_name(&self) -> &str;

    async fn connect(&self) -> Result<(), BoxError>;

    async fn disconnect(&self) {}
}

/// Release hook run when the owning scope (or the container, for singletons)
/// ends.
#[async_trait]
pub trait Dispose: Send + Sync + 'static {
    async fn dispose(&self);
}
