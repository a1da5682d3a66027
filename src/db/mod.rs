pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use sqlx::MySqlPool;

use crate::attendance::store::ShiftStore;
use crate::model::shift::default_shifts;

/// Connects and brings the schema up to date.
pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Inserts the default Morning and Evening shifts when no shift exists yet.
/// Returns whether anything was inserted.
pub async fn seed_default_shifts<S: ShiftStore + ?Sized>(store: &S) -> crate::error::Result<bool> {
    if !store.list_shifts().await?.is_empty() {
        return Ok(false);
    }
    for shift in default_shifts() {
        let created = store.insert_shift(&shift).await?;
        tracing::info!(shift_id = created.id, name = %created.name, "Seeded default shift");
    }
    Ok(true)
}
