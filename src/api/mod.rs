pub mod attendance;
pub mod attendance_admin;
pub mod gym;
pub mod location;
pub mod shift;
pub mod user;

use serde::Deserialize;

const MAX_PAGE_SIZE: u32 = 100;

/// `skip`/`limit` paging shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl Page {
    pub fn skip(&self) -> i64 {
        i64::from(self.skip.unwrap_or(0))
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE))
    }
}
