use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    pagination::{PageQuery, Pagination, DEFAULT_LIMIT},
    users::repo_types::{AdminUserView, Role},
};

/// `GET /admin/users?page=&limit=&role=`
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub role: Option<Role>,
}

fn first_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl ListUsersQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BanRequest {
    #[validate(length(min = 3, max = 500, message = "Ban reason must be 3-500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<AdminUserView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserDetailsResponse {
    pub user: AdminUserView,
}

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub message: String,
    pub user: AdminUserView,
}
