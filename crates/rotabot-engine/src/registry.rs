//! The configured rota set, looked up by id.

use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::types::Rota;

/// Immutable set of rota definitions, built from config at startup.
#[derive(Debug, Clone)]
pub struct RotaRegistry {
    rotas: Vec<Rota>,
}

impl RotaRegistry {
    pub fn new(rotas: Vec<Rota>) -> Self {
        Self { rotas }
    }

    /// Look up a rota by id.
    pub fn get(&self, id: &str) -> Result<&Rota> {
        self.rotas
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RotaBotError::RotaNotFound(id.to_string()))
    }

    /// All configured rotas, in config order.
    pub fn all(&self) -> &[Rota] {
        &self.rotas
    }
}
