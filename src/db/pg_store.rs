// src/db/pg_store.rs

use sqlx::PgPool;

// Cada área (conversas, campanhas, pesquisas...) implementa sua porta
// para este tipo no arquivo *_repo.rs correspondente.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
