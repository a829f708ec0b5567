mod api_server;
mod proxy_server;

pub use api_server::ApiServer;
pub use proxy_server::ProxyServer;

// Re-export for external use (e.g., integration tests)
#[allow(unused_imports)]
pub use api_server::{ApiError, ApiState, RegisterRequest, RegisterResponse};
#[allow(unused_imports)]
pub use proxy_server::{ForwardError, ProxyState};
