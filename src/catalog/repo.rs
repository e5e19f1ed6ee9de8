use async_trait::async_trait;
use sqlx::PgPool;

use crate::catalog::repo_types::{Category, NewCategory, NewProduct, ProductChanges, ProductRow};
use crate::db::RepoResult;

/// Rewrites a serial blob. Runs while the product row is locked.
pub type SerialEdit<'a> = &'a (dyn Fn(&str) -> String + Send + Sync);

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Ordered by name.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>>;
    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    async fn create_category(&self, new: NewCategory<'_>) -> RepoResult<Category>;
    async fn update_category(&self, id: i32, new: NewCategory<'_>)
        -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: i32) -> RepoResult<bool>;
    async fn count_products_in_category(&self, id: i32) -> RepoResult<i64>;

    async fn create_product(&self, new: NewProduct) -> RepoResult<ProductRow>;
    async fn find_product(&self, id: i32) -> RepoResult<Option<ProductRow>>;
    /// Newest first, optionally narrowed to one category. Returns the page and the total count.
    async fn list_products(
        &self,
        category_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<(Vec<ProductRow>, i64)>;
    async fn all_products(&self) -> RepoResult<Vec<ProductRow>>;
    async fn update_product(&self, id: i32, changes: ProductChanges)
        -> RepoResult<Option<ProductRow>>;
    /// Atomic read-modify-write of the serial blob.
    async fn update_serials(&self, id: i32, edit: SerialEdit<'_>)
        -> RepoResult<Option<ProductRow>>;
    async fn delete_product(&self, id: i32) -> RepoResult<bool>;
}

pub struct PgCatalogRepo {
    db: PgPool,
}

impl PgCatalogRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

// Expects the product as `p` and its category as `c`.
const PRODUCT_COLUMNS: &str = r#"
    p.id, p.header, p.subheadline, p.body, p.price::float8 AS price, p.image_url,
    p.category_id, c.name AS category_name, c.description AS category_description,
    p.serials, p.created_at, p.updated_at
"#;

const PRODUCT_JOIN: &str = "JOIN product_categories c ON c.id = p.category_id";

#[async_trait]
impl CatalogRepo for PgCatalogRepo {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_categories ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_categories WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_category(&self, new: NewCategory<'_>) -> RepoResult<Category> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO product_categories (name, description)
            VALUES ($1, $2)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(new.name)
        .bind(new.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_category(
        &self,
        id: i32,
        new: NewCategory<'_>,
    ) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE product_categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.name)
        .bind(new.description)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        let deleted: Option<i32> =
            sqlx::query_scalar("DELETE FROM product_categories WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(deleted.is_some())
    }

    async fn count_products_in_category(&self, id: i32) -> RepoResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn create_product(&self, new: NewProduct) -> RepoResult<ProductRow> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            WITH p AS (
                INSERT INTO products (header, subheadline, body, price, image_url, category_id, serials)
                VALUES ($1, $2, $3, $4::float8::numeric, $5, $6, $7)
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p {PRODUCT_JOIN}
            "#
        ))
        .bind(&new.header)
        .bind(&new.subheadline)
        .bind(&new.body)
        .bind(new.price)
        .bind(&new.image_url)
        .bind(new.category_id)
        .bind(&new.serials)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_product(&self, id: i32) -> RepoResult<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOIN} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_products(
        &self,
        category_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<(Vec<ProductRow>, i64)> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p {PRODUCT_JOIN}
            WHERE ($1::int4 IS NULL OR p.category_id = $1)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::int4 IS NULL OR category_id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        Ok((rows, total))
    }

    async fn all_products(&self) -> RepoResult<Vec<ProductRow>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOIN} ORDER BY p.id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_product(
        &self,
        id: i32,
        changes: ProductChanges,
    ) -> RepoResult<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            WITH p AS (
                UPDATE products SET
                    header      = COALESCE($2, header),
                    subheadline = COALESCE($3, subheadline),
                    body        = COALESCE($4, body),
                    price       = COALESCE($5::float8::numeric, price),
                    image_url   = COALESCE($6, image_url),
                    category_id = COALESCE($7, category_id),
                    serials     = COALESCE($8, serials),
                    updated_at  = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p {PRODUCT_JOIN}
            "#
        ))
        .bind(id)
        .bind(changes.header)
        .bind(changes.subheadline)
        .bind(changes.body)
        .bind(changes.price)
        .bind(changes.image_url)
        .bind(changes.category_id)
        .bind(changes.serials)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_serials(
        &self,
        id: i32,
        edit: SerialEdit<'_>,
    ) -> RepoResult<Option<ProductRow>> {
        let mut tx = self.db.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT serials FROM products WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            WITH p AS (
                UPDATE products SET serials = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p {PRODUCT_JOIN}
            "#
        ))
        .bind(id)
        .bind(edit(&current))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn delete_product(&self, id: i32) -> RepoResult<bool> {
        let deleted: Option<i32> =
            sqlx::query_scalar("DELETE FROM products WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(deleted.is_some())
    }
}
