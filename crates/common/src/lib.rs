pub mod domain;
pub mod nats;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAccessTokenProvider;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockIdentityProvider;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockKeyValueStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockMailer;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockSubgraphClient;
