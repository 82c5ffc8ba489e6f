use crate::api::RegistryContext;

#[derive(Clone)]
pub struct AppState {
    pub api: RegistryContext,
}
