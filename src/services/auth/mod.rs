pub mod factory;
pub mod gate;
pub mod introspection;
pub mod role_guard;
pub mod roles;

use std::sync::Arc;

pub use factory::build_auth_mode;
pub use gate::AuthGate;
pub use role_guard::{DisabledPolicy, require_role};
pub use roles::Role;

/// Process-wide authentication switch, injected once via `AppState`.
///
/// `Disabled` is a valid operating mode (local/test): the gate is a no-op and
/// handlers see `RequestAuth::Disabled`.
#[derive(Clone, Debug)]
pub enum AuthMode {
    Disabled,
    Enabled(Arc<AuthGate>),
}

impl AuthMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, AuthMode::Enabled(_))
    }
}
