use tracing::info;

use crate::{
    catalog::{
        dto::{CategoryRequest, ProductCreate, ProductUpdate, DEFAULT_LOW_STOCK_THRESHOLD},
        repo::CatalogRepo,
        repo_types::{Category, NewCategory, NewProduct, ProductChanges, ProductRow},
        serials,
    },
    db::RepoError,
    error::{ApiError, ApiResult},
};

fn category_taken(err: RepoError) -> ApiError {
    if err.is_duplicate("name") {
        ApiError::conflict("Category name already exists")
    } else {
        err.into()
    }
}

pub async fn create_category(repo: &dyn CatalogRepo, req: &CategoryRequest) -> ApiResult<Category> {
    let name = req.name.trim();
    if repo.find_category_by_name(name).await?.is_some() {
        return Err(ApiError::conflict("Category name already exists"));
    }
    let category = repo
        .create_category(NewCategory {
            name,
            description: req.description.as_deref(),
        })
        .await
        .map_err(category_taken)?;
    info!(category_id = category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn update_category(
    repo: &dyn CatalogRepo,
    id: i32,
    req: &CategoryRequest,
) -> ApiResult<Category> {
    let name = req.name.trim();
    if let Some(other) = repo.find_category_by_name(name).await? {
        if other.id != id {
            return Err(ApiError::conflict("Category name already exists"));
        }
    }
    repo.update_category(
        id,
        NewCategory {
            name,
            description: req.description.as_deref(),
        },
    )
    .await
    .map_err(category_taken)?
    .ok_or_else(|| ApiError::not_found("Category not found"))
}

pub async fn delete_category(repo: &dyn CatalogRepo, id: i32) -> ApiResult<()> {
    if repo.find_category(id).await?.is_none() {
        return Err(ApiError::not_found("Category not found"));
    }
    if repo.count_products_in_category(id).await? > 0 {
        return Err(ApiError::conflict("Category still has products"));
    }
    match repo.delete_category(id).await {
        Ok(true) => {
            info!(category_id = id, "category deleted");
            Ok(())
        }
        Ok(false) => Err(ApiError::not_found("Category not found")),
        // a product was added between the count and the delete
        Err(RepoError::ForeignKeyViolation(_)) => {
            Err(ApiError::conflict("Category still has products"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Finds a category by name, creating it when missing.
pub async fn find_or_create_category(repo: &dyn CatalogRepo, name: &str) -> ApiResult<Category> {
    let name = name.trim();
    if let Some(found) = repo.find_category_by_name(name).await? {
        return Ok(found);
    }
    match repo
        .create_category(NewCategory {
            name,
            description: None,
        })
        .await
    {
        Ok(created) => {
            info!(category_id = created.id, name = %created.name, "category created for product");
            Ok(created)
        }
        // lost a race with a concurrent insert of the same name
        Err(e) if e.is_duplicate("name") => repo
            .find_category_by_name(name)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found")),
        Err(e) => Err(e.into()),
    }
}

async fn resolve_category(
    repo: &dyn CatalogRepo,
    category_id: Option<i32>,
    category: Option<&str>,
) -> ApiResult<Option<i32>> {
    match (category_id, category) {
        (Some(_), Some(_)) => Err(ApiError::field(
            "category",
            "Provide either category_id or category, not both",
        )),
        (Some(id), None) => {
            repo.find_category(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Category not found"))?;
            Ok(Some(id))
        }
        (None, Some(name)) => Ok(Some(find_or_create_category(repo, name).await?.id)),
        (None, None) => Ok(None),
    }
}

pub async fn create_product(repo: &dyn CatalogRepo, req: ProductCreate) -> ApiResult<ProductRow> {
    let category_id = resolve_category(repo, req.category_id, req.category.as_deref())
        .await?
        .ok_or_else(|| ApiError::field("category_id", "category_id or category is required"))?;

    let product = repo
        .create_product(NewProduct {
            header: req.header.trim().to_string(),
            subheadline: req.subheadline.unwrap_or_default(),
            body: req.body.unwrap_or_default(),
            price: req.price,
            image_url: req.image_url,
            category_id,
            serials: req
                .serials
                .map(|s| serials::normalize(&s.items()))
                .unwrap_or_default(),
        })
        .await?;
    info!(
        product_id = product.id,
        category_id = product.category_id,
        stock = serials::count(&product.serials),
        "product created"
    );
    Ok(product)
}

pub async fn update_product(
    repo: &dyn CatalogRepo,
    id: i32,
    req: ProductUpdate,
) -> ApiResult<ProductRow> {
    if req.is_empty() {
        return Err(ApiError::field("body", "At least one field must be provided"));
    }
    if repo.find_product(id).await?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }
    let category_id = resolve_category(repo, req.category_id, req.category.as_deref()).await?;

    let changes = ProductChanges {
        header: req.header.map(|h| h.trim().to_string()),
        subheadline: req.subheadline,
        body: req.body,
        price: req.price,
        image_url: req.image_url,
        category_id,
        serials: req.serials.map(|s| serials::normalize(&s.items())),
    };
    let replaced_serials = changes.serials.is_some();

    let product = repo
        .update_product(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    info!(product_id = id, replaced_serials, "product updated");
    Ok(product)
}

pub async fn add_serials(repo: &dyn CatalogRepo, id: i32, items: Vec<String>) -> ApiResult<ProductRow> {
    let product = repo
        .update_serials(id, &|blob: &str| serials::append(blob, &items))
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    info!(
        product_id = id,
        requested = items.len(),
        stock = serials::count(&product.serials),
        "serials added"
    );
    Ok(product)
}

pub async fn remove_serials(
    repo: &dyn CatalogRepo,
    id: i32,
    items: Vec<String>,
) -> ApiResult<ProductRow> {
    let product = repo
        .update_serials(id, &|blob: &str| serials::remove(blob, &items))
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    info!(
        product_id = id,
        requested = items.len(),
        stock = serials::count(&product.serials),
        "serials removed"
    );
    Ok(product)
}

/// Products whose stock is strictly below `threshold`, lowest stock first.
pub async fn low_stock(
    repo: &dyn CatalogRepo,
    threshold: Option<i64>,
) -> ApiResult<(Vec<ProductRow>, i64)> {
    let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    if threshold < 1 {
        return Err(ApiError::field("threshold", "Threshold must be at least 1"));
    }
    let mut products: Vec<ProductRow> = repo
        .all_products()
        .await?
        .into_iter()
        .filter(|p| serials::count(&p.serials) < threshold)
        .collect();
    products.sort_by_key(|p| (serials::count(&p.serials), p.id));
    Ok((products, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dto::SerialsInput;
    use crate::testing::MemoryCatalogRepo;

    fn product(header: &str, category: Option<&str>, category_id: Option<i32>) -> ProductCreate {
        ProductCreate {
            header: header.into(),
            subheadline: None,
            body: None,
            price: 19.99,
            image_url: None,
            category_id,
            category: category.map(String::from),
            serials: None,
        }
    }

    #[tokio::test]
    async fn category_by_name_is_found_or_created() {
        let repo = MemoryCatalogRepo::default();
        let a = create_product(&repo, product("Game key", Some("Games"), None))
            .await
            .unwrap();
        let b = create_product(&repo, product("Other key", Some(" Games "), None))
            .await
            .unwrap();
        assert_eq!(a.category_id, b.category_id);
        assert_eq!(a.category_name, "Games");
        assert_eq!(repo.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn product_needs_exactly_one_category_reference() {
        let repo = MemoryCatalogRepo::default();
        let none = create_product(&repo, product("Game key", None, None)).await;
        assert!(matches!(none, Err(ApiError::Validation(_))));

        let both = create_product(&repo, product("Game key", Some("Games"), Some(1))).await;
        assert!(matches!(both, Err(ApiError::Validation(_))));

        let unknown = create_product(&repo, product("Game key", None, Some(42))).await;
        assert!(matches!(unknown, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn serials_are_normalized_on_create_and_update() {
        let repo = MemoryCatalogRepo::default();
        let mut req = product("Game key", Some("Games"), None);
        req.serials = Some(SerialsInput::List(vec!["A1\n\nB2".into(), " A1 ".into()]));
        let created = create_product(&repo, req).await.unwrap();
        assert_eq!(created.serials, "A1\nB2");

        let update = ProductUpdate {
            header: None,
            subheadline: None,
            body: None,
            price: None,
            image_url: None,
            category_id: None,
            category: None,
            serials: Some(SerialsInput::Text("X\n\nY\n".into())),
        };
        let updated = update_product(&repo, created.id, update).await.unwrap();
        assert_eq!(updated.serials, "X\nY");
        assert_eq!(updated.header, "Game key");
    }

    #[tokio::test]
    async fn add_and_remove_serials_round_trip() {
        let repo = MemoryCatalogRepo::default();
        let mut req = product("Game key", Some("Games"), None);
        req.serials = Some(SerialsInput::Text("A1\nB2".into()));
        let p = create_product(&repo, req).await.unwrap();

        let added = add_serials(&repo, p.id, vec!["B2".into(), "C3".into()])
            .await
            .unwrap();
        assert_eq!(serials::count(&added.serials), 3);

        let removed = remove_serials(&repo, p.id, vec!["C3".into()]).await.unwrap();
        assert_eq!(removed.serials, "A1\nB2");

        let missing = add_serials(&repo, 999, vec!["Z".into()]).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn category_with_products_cannot_be_deleted() {
        let repo = MemoryCatalogRepo::default();
        let p = create_product(&repo, product("Game key", Some("Games"), None))
            .await
            .unwrap();
        let res = delete_category(&repo, p.category_id).await;
        assert!(matches!(res, Err(ApiError::Conflict(_))));

        assert!(repo.delete_product(p.id).await.unwrap());
        delete_category(&repo, p.category_id).await.unwrap();
        let gone = delete_category(&repo, p.category_id).await;
        assert!(matches!(gone, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn low_stock_uses_strict_threshold() {
        let repo = MemoryCatalogRepo::default();
        for (name, blob) in [("Empty", ""), ("Two", "a\nb"), ("Five", "1\n2\n3\n4\n5")] {
            let mut req = product(name, Some("Games"), None);
            req.serials = Some(SerialsInput::Text(blob.into()));
            create_product(&repo, req).await.unwrap();
        }

        let (rows, threshold) = low_stock(&repo, None).await.unwrap();
        assert_eq!(threshold, 5);
        let names: Vec<&str> = rows.iter().map(|p| p.header.as_str()).collect();
        assert_eq!(names, vec!["Empty", "Two"]);

        let (rows, _) = low_stock(&repo, Some(1)).await.unwrap();
        assert_eq!(rows.len(), 1);

        assert!(matches!(low_stock(&repo, Some(0)).await, Err(ApiError::Validation(_))));
    }
}
