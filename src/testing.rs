//! In-memory repositories and fixtures for tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use axum::extract::FromRef;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, password::hash_password},
    catalog::{
        repo::{CatalogRepo, SerialEdit},
        repo_types::{Category, NewCategory, NewProduct, ProductChanges, ProductRow},
    },
    db::{RepoError, RepoResult},
    state::AppState,
    users::{
        repo::{UserRepo, BAN_REASON_ROLE_CHANGE},
        repo_types::{NewUser, Role, User},
    },
};

pub const TEST_PASSWORD: &str = "correct-horse-42";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepo {
    fn update(&self, id: Uuid, f: impl FnOnce(&mut User)) -> Option<User> {
        let mut users = lock(&self.users);
        let user = users.iter_mut().find(|u| u.id == id)?;
        f(user);
        user.updated_at = OffsetDateTime::now_utc();
        Some(user.clone())
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new: NewUser<'_>) -> RepoResult<User> {
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.email == new.email) {
            return Err(RepoError::UniqueViolation("users_email_key".into()));
        }
        if users.iter().any(|u| u.username == new.username) {
            return Err(RepoError::UniqueViolation("users_username_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email.to_string(),
            username: new.username.to_string(),
            password_hash: new.password_hash.to_string(),
            role: new.role,
            banned_reason: None,
            banned_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(
        &self,
        role: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<(Vec<User>, i64)> {
        let users = lock(&self.users);
        let matching: Vec<&User> = users
            .iter()
            .rev()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect();
        let page = matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|u| (*u).clone())
            .collect();
        Ok((page, matching.len() as i64))
    }

    async fn ban(&self, id: Uuid, reason: &str) -> RepoResult<Option<User>> {
        Ok(self.update(id, |u| {
            u.role = Role::Banned;
            u.banned_reason = Some(reason.to_string());
            u.banned_at = Some(OffsetDateTime::now_utc());
        }))
    }

    async fn unban(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.update(id, |u| {
            u.role = Role::Member;
            u.banned_reason = None;
            u.banned_at = None;
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        Ok(self.update(id, |u| {
            u.role = role;
            if role == Role::Banned {
                u.banned_reason = Some(BAN_REASON_ROLE_CHANGE.to_string());
                u.banned_at = Some(OffsetDateTime::now_utc());
            } else {
                u.banned_reason = None;
                u.banned_at = None;
            }
        }))
    }
}

#[derive(Default)]
struct CatalogTables {
    categories: Vec<Category>,
    products: Vec<ProductRow>,
    next_category: i32,
    next_product: i32,
}

impl CatalogTables {
    fn joined(&self, product: &ProductRow) -> Option<ProductRow> {
        let category = self
            .categories
            .iter()
            .find(|c| c.id == product.category_id)?;
        Some(ProductRow {
            category_name: category.name.clone(),
            category_description: category.description.clone(),
            ..product.clone()
        })
    }

    fn has_category(&self, id: i32) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    fn name_taken(&self, name: &str, except: Option<i32>) -> bool {
        self.categories
            .iter()
            .any(|c| c.name == name && Some(c.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryCatalogRepo {
    tables: Mutex<CatalogTables>,
}

fn category_fk() -> RepoError {
    RepoError::ForeignKeyViolation("products_category_id_fkey".into())
}

fn category_unique() -> RepoError {
    RepoError::UniqueViolation("product_categories_name_key".into())
}

#[async_trait]
impl CatalogRepo for MemoryCatalogRepo {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut categories = lock(&self.tables).categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        Ok(lock(&self.tables)
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        Ok(lock(&self.tables)
            .categories
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_category(&self, new: NewCategory<'_>) -> RepoResult<Category> {
        let mut t = lock(&self.tables);
        if t.name_taken(new.name, None) {
            return Err(category_unique());
        }
        t.next_category += 1;
        let now = OffsetDateTime::now_utc();
        let category = Category {
            id: t.next_category,
            name: new.name.to_string(),
            description: new.description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        new: NewCategory<'_>,
    ) -> RepoResult<Option<Category>> {
        let mut t = lock(&self.tables);
        if t.name_taken(new.name, Some(id)) {
            return Err(category_unique());
        }
        let Some(category) = t.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = new.name.to_string();
        category.description = new.description.map(str::to_string);
        category.updated_at = OffsetDateTime::now_utc();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        let mut t = lock(&self.tables);
        if t.products.iter().any(|p| p.category_id == id) {
            return Err(category_fk());
        }
        let before = t.categories.len();
        t.categories.retain(|c| c.id != id);
        Ok(t.categories.len() != before)
    }

    async fn count_products_in_category(&self, id: i32) -> RepoResult<i64> {
        Ok(lock(&self.tables)
            .products
            .iter()
            .filter(|p| p.category_id == id)
            .count() as i64)
    }

    async fn create_product(&self, new: NewProduct) -> RepoResult<ProductRow> {
        let mut t = lock(&self.tables);
        if !t.has_category(new.category_id) {
            return Err(category_fk());
        }
        t.next_product += 1;
        let now = OffsetDateTime::now_utc();
        let row = ProductRow {
            id: t.next_product,
            header: new.header,
            subheadline: new.subheadline,
            body: new.body,
            price: new.price,
            image_url: new.image_url,
            category_id: new.category_id,
            category_name: String::new(),
            category_description: None,
            serials: new.serials,
            created_at: now,
            updated_at: now,
        };
        t.products.push(row.clone());
        t.joined(&row).ok_or_else(category_fk)
    }

    async fn find_product(&self, id: i32) -> RepoResult<Option<ProductRow>> {
        let t = lock(&self.tables);
        Ok(t
            .products
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| t.joined(p)))
    }

    async fn list_products(
        &self,
        category_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<(Vec<ProductRow>, i64)> {
        let t = lock(&self.tables);
        let matching: Vec<&ProductRow> = t
            .products
            .iter()
            .rev()
            .filter(|p| category_id.map_or(true, |c| p.category_id == c))
            .collect();
        let page = matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|p| t.joined(p))
            .collect();
        Ok((page, matching.len() as i64))
    }

    async fn all_products(&self) -> RepoResult<Vec<ProductRow>> {
        let t = lock(&self.tables);
        Ok(t.products.iter().filter_map(|p| t.joined(p)).collect())
    }

    async fn update_product(
        &self,
        id: i32,
        changes: ProductChanges,
    ) -> RepoResult<Option<ProductRow>> {
        let mut t = lock(&self.tables);
        if let Some(category_id) = changes.category_id {
            if !t.has_category(category_id) {
                return Err(category_fk());
            }
        }
        let Some(p) = t.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.header {
            p.header = v;
        }
        if let Some(v) = changes.subheadline {
            p.subheadline = v;
        }
        if let Some(v) = changes.body {
            p.body = v;
        }
        if let Some(v) = changes.price {
            p.price = v;
        }
        if let Some(v) = changes.image_url {
            p.image_url = Some(v);
        }
        if let Some(v) = changes.category_id {
            p.category_id = v;
        }
        if let Some(v) = changes.serials {
            p.serials = v;
        }
        p.updated_at = OffsetDateTime::now_utc();
        let row = p.clone();
        Ok(t.joined(&row))
    }

    async fn update_serials(
        &self,
        id: i32,
        edit: SerialEdit<'_>,
    ) -> RepoResult<Option<ProductRow>> {
        let mut t = lock(&self.tables);
        let Some(p) = t.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        p.serials = edit(&p.serials);
        p.updated_at = OffsetDateTime::now_utc();
        let row = p.clone();
        Ok(t.joined(&row))
    }

    async fn delete_product(&self, id: i32) -> RepoResult<bool> {
        let mut t = lock(&self.tables);
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        Ok(t.products.len() != before)
    }
}

fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).unwrap())
}

/// Inserts `username` (email `<username>@example.com`) with [`TEST_PASSWORD`].
pub async fn seed_user(state: &AppState, username: &str, role: Role) -> User {
    let email = format!("{username}@example.com");
    let user = state
        .users
        .create(NewUser {
            email: &email,
            username,
            password_hash: test_password_hash(),
            role: if role == Role::Banned { Role::Member } else { role },
        })
        .await
        .unwrap();
    if role == Role::Banned {
        return state.users.ban(user.id, "spam").await.unwrap().unwrap();
    }
    user
}

/// `Authorization` header value carrying an access token for `user`.
pub fn bearer(state: &AppState, user: &User) -> String {
    let token = JwtKeys::from_ref(state).sign_access(user.id).unwrap();
    format!("Bearer {token}")
}
