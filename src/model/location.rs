use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct StateCountry {
    pub id: u64,
    #[schema(example = "Karnataka")]
    pub state_name: String,
    #[schema(example = "India")]
    pub country_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Pincode {
    pub id: u64,
    #[schema(example = "560001")]
    pub pincode: String,
    pub state_country_id: u64,
}
