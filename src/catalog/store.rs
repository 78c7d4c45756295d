use super::slug::{is_canonical, slugify, unique_slug};
use super::source::CatalogSource;
use super::types::*;
use crate::clock::Clock;
use crate::error::AppError;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory catalog keyed by entity id.
///
/// Reads go straight to the maps. Writes are serialised by `write_lock` so slug
/// uniqueness checks and the insert that follows them cannot interleave.
pub struct CatalogStore {
    products: DashMap<String, Product>,
    categories: DashMap<String, Category>,
    posts: DashMap<String, Post>,
    seq: AtomicU64,
    write_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl CatalogStore {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            products: DashMap::new(),
            categories: DashMap::new(),
            posts: DashMap::new(),
            seq: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            clock,
        })
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the maps are still consistent.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================================
    // PRODUCTS
    // ============================================================

    pub fn create_product(&self, req: CreateProductRequest) -> Result<ProductChange, AppError> {
        let _guard = self.lock_writes();

        let name = required(&req.name, "name")?;
        let category_slug = self.resolve_category(req.category_slug.as_deref())?;
        let slug = self.claim_product_slug(req.slug.as_deref(), &name, None)?;

        let now = self.now();
        let product = Product {
            id: uuid::Uuid::new_v4().to_string(),
            slug,
            name,
            description: req.description.trim().to_string(),
            price: req.price,
            category_slug,
            status: req.status,
            published_at: req.published_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            seq: self.next_seq(),
        };

        self.products.insert(product.id.clone(), product.clone());
        tracing::info!("Created product {} ({})", product.slug, product.id);

        Ok(ProductChange {
            product,
            previous_slug: None,
            previous_category_slug: None,
        })
    }

    pub fn update_product(
        &self,
        id: &str,
        req: UpdateProductRequest,
    ) -> Result<ProductChange, AppError> {
        let _guard = self.lock_writes();

        let mut product = self
            .product_by_id(id)
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        let old_slug = product.slug.clone();
        let old_category = product.category_slug.clone();

        if let Some(name) = req.name.as_deref() {
            product.name = required(name, "name")?;
        }
        if let Some(slug) = req.slug.as_deref()
            && slug.trim() != product.slug
        {
            product.slug = self.claim_product_slug(Some(slug), &product.name, Some(id))?;
        }
        if let Some(description) = req.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = req.price {
            product.price = price;
        }
        if let Some(category) = req.category_slug.as_deref() {
            product.category_slug = self.resolve_category(Some(category))?;
        }
        if let Some(status) = req.status {
            product.status = status;
        }
        if req.published_at.is_some() {
            product.published_at = req.published_at;
        }
        product.updated_at = self.now();

        self.products.insert(product.id.clone(), product.clone());
        tracing::info!("Updated product {} ({})", product.slug, product.id);

        Ok(ProductChange {
            previous_slug: (old_slug != product.slug).then_some(old_slug),
            previous_category_slug: (old_category != product.category_slug)
                .then_some(old_category)
                .flatten(),
            product,
        })
    }

    /// Soft delete: the record stays, stamped with `deleted_at`.
    pub fn delete_product(&self, id: &str) -> Result<ProductChange, AppError> {
        let _guard = self.lock_writes();

        let mut product = self
            .product_by_id(id)
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        let now = self.now();
        product.deleted_at = Some(now);
        product.updated_at = now;

        self.products.insert(product.id.clone(), product.clone());
        tracing::info!("Soft-deleted product {} ({})", product.slug, product.id);

        Ok(ProductChange {
            product,
            previous_slug: None,
            previous_category_slug: None,
        })
    }

    /// Non-deleted product by id.
    pub fn product_by_id(&self, id: &str) -> Option<Product> {
        self.products
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|product| product.deleted_at.is_none())
    }

    /// Non-deleted product by slug.
    pub fn product_by_slug(&self, slug: &str) -> Option<Product> {
        self.products
            .iter()
            .find(|entry| entry.slug == slug && entry.deleted_at.is_none())
            .map(|entry| entry.value().clone())
    }

    pub fn visible_products(&self, now: u64) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|entry| entry.is_visible(now))
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by_key(|product| product.seq);
        products
    }

    /// Earliest upcoming publish time of a scheduled product or post.
    pub fn next_publication(&self, now: u64) -> Option<u64> {
        let products: Option<u64> = self
            .products
            .iter()
            .filter_map(|entry| entry.scheduled_after(now))
            .min();
        let posts: Option<u64> = self
            .posts
            .iter()
            .filter_map(|entry| entry.scheduled_after(now))
            .min();
        products.into_iter().chain(posts).min()
    }

    pub fn visible_products_in_category(&self, category_slug: &str, now: u64) -> Vec<Product> {
        self.visible_products(now)
            .into_iter()
            .filter(|product| product.category_slug.as_deref() == Some(category_slug))
            .collect()
    }

    fn product_slug_taken(&self, slug: &str, except_id: Option<&str>) -> bool {
        self.products.iter().any(|entry| {
            entry.slug == slug
                && entry.deleted_at.is_none()
                && Some(entry.id.as_str()) != except_id
        })
    }

    fn claim_product_slug(
        &self,
        requested: Option<&str>,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<String, AppError> {
        match requested.map(str::trim).filter(|slug| !slug.is_empty()) {
            Some(slug) => {
                if !is_canonical(slug) {
                    return Err(AppError::Validation(format!(
                        "slug '{slug}' is not canonical (expected '{}')",
                        slugify(slug)
                    )));
                }
                if self.product_slug_taken(slug, except_id) {
                    return Err(AppError::Conflict(format!("product slug '{slug}' is taken")));
                }
                Ok(slug.to_string())
            }
            None => Ok(unique_slug(&slugify(name), |candidate| {
                self.product_slug_taken(candidate, except_id)
            })),
        }
    }

    fn resolve_category(&self, requested: Option<&str>) -> Result<Option<String>, AppError> {
        match requested.map(str::trim).filter(|slug| !slug.is_empty()) {
            Some(slug) if self.category_by_slug(slug).is_some() => Ok(Some(slug.to_string())),
            Some(slug) => Err(AppError::Validation(format!("unknown category '{slug}'"))),
            None => Ok(None),
        }
    }

    // ============================================================
    // CATEGORIES
    // ============================================================

    pub fn create_category(&self, req: CreateCategoryRequest) -> Result<CategoryChange, AppError> {
        let _guard = self.lock_writes();

        let name = required(&req.name, "name")?;
        let slug = self.claim_category_slug(req.slug.as_deref(), &name, None)?;

        let now = self.now();
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            slug,
            name,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            seq: self.next_seq(),
        };

        self.categories
            .insert(category.id.clone(), category.clone());
        tracing::info!("Created category {}", category.slug);

        Ok(CategoryChange {
            category,
            previous_slug: None,
            cascaded_products: Vec::new(),
        })
    }

    /// Renaming a slug rewrites `category_slug` on every product that pointed at it.
    pub fn update_category(
        &self,
        slug: &str,
        req: UpdateCategoryRequest,
    ) -> Result<CategoryChange, AppError> {
        let _guard = self.lock_writes();

        let mut category = self
            .category_by_slug(slug)
            .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

        if let Some(name) = req.name.as_deref() {
            category.name = required(name, "name")?;
        }

        let mut previous_slug = None;
        let mut cascaded_products = Vec::new();
        if let Some(new_slug) = req.slug.as_deref()
            && new_slug.trim() != category.slug
        {
            let new_slug =
                self.claim_category_slug(Some(new_slug), &category.name, Some(&category.id))?;
            for mut entry in self.products.iter_mut() {
                if entry.category_slug.as_deref() == Some(slug) {
                    entry.category_slug = Some(new_slug.clone());
                    if entry.deleted_at.is_none() {
                        cascaded_products.push(entry.slug.clone());
                    }
                }
            }
            previous_slug = Some(std::mem::replace(&mut category.slug, new_slug));
        }
        category.updated_at = self.now();

        self.categories
            .insert(category.id.clone(), category.clone());
        tracing::info!(
            "Updated category {} (previous slug: {:?}, {} products re-pointed)",
            category.slug,
            previous_slug,
            cascaded_products.len()
        );

        Ok(CategoryChange {
            category,
            previous_slug,
            cascaded_products,
        })
    }

    /// Soft-deletes the category and every live product filed under it.
    pub fn delete_category(&self, slug: &str) -> Result<CategoryChange, AppError> {
        let _guard = self.lock_writes();

        let mut category = self
            .category_by_slug(slug)
            .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;
        let now = self.now();

        let mut cascaded_products = Vec::new();
        for mut entry in self.products.iter_mut() {
            if entry.category_slug.as_deref() == Some(slug) && entry.deleted_at.is_none() {
                entry.deleted_at = Some(now);
                entry.updated_at = now;
                cascaded_products.push(entry.slug.clone());
            }
        }

        category.deleted_at = Some(now);
        category.updated_at = now;
        self.categories
            .insert(category.id.clone(), category.clone());
        tracing::info!(
            "Soft-deleted category {} and {} products",
            category.slug,
            cascaded_products.len()
        );

        Ok(CategoryChange {
            category,
            previous_slug: None,
            cascaded_products,
        })
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|entry| entry.slug == slug && entry.deleted_at.is_none())
            .map(|entry| entry.value().clone())
    }

    pub fn live_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|entry| entry.deleted_at.is_none())
            .map(|entry| entry.value().clone())
            .collect();
        categories.sort_by_key(|category| category.seq);
        categories
    }

    fn claim_category_slug(
        &self,
        requested: Option<&str>,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<String, AppError> {
        let taken = |candidate: &str| {
            self.categories.iter().any(|entry| {
                entry.slug == candidate
                    && entry.deleted_at.is_none()
                    && Some(entry.id.as_str()) != except_id
            })
        };

        match requested.map(str::trim).filter(|slug| !slug.is_empty()) {
            Some(slug) if !is_canonical(slug) => Err(AppError::Validation(format!(
                "slug '{slug}' is not canonical (expected '{}')",
                slugify(slug)
            ))),
            Some(slug) if taken(slug) => {
                Err(AppError::Conflict(format!("category slug '{slug}' is taken")))
            }
            Some(slug) => Ok(slug.to_string()),
            None => Ok(unique_slug(&slugify(name), &taken)),
        }
    }

    // ============================================================
    // POSTS
    // ============================================================

    pub fn create_post(&self, req: CreatePostRequest) -> Result<Post, AppError> {
        let _guard = self.lock_writes();

        let title = required(&req.title, "title")?;
        let taken = |candidate: &str| {
            self.posts
                .iter()
                .any(|entry| entry.slug == candidate && entry.deleted_at.is_none())
        };
        let slug = match req.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) if !is_canonical(slug) => {
                return Err(AppError::Validation(format!("slug '{slug}' is not canonical")));
            }
            Some(slug) if taken(slug) => {
                return Err(AppError::Conflict(format!("post slug '{slug}' is taken")));
            }
            Some(slug) => slug.to_string(),
            None => unique_slug(&slugify(&title), &taken),
        };

        let now = self.now();
        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            slug,
            title,
            excerpt: req.excerpt.trim().to_string(),
            status: req.status,
            published_at: req.published_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            seq: self.next_seq(),
        };

        self.posts.insert(post.id.clone(), post.clone());
        tracing::info!("Created post {}", post.slug);
        Ok(post)
    }

    pub fn delete_post(&self, id: &str) -> Result<Post, AppError> {
        let _guard = self.lock_writes();

        let mut post = self
            .posts
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|post| post.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
        let now = self.now();
        post.deleted_at = Some(now);
        post.updated_at = now;

        self.posts.insert(post.id.clone(), post.clone());
        tracing::info!("Soft-deleted post {}", post.slug);
        Ok(post)
    }

    pub fn visible_posts(&self, now: u64) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.is_visible(now))
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by_key(|post| post.seq);
        posts
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

#[async_trait]
impl CatalogSource for CatalogStore {
    async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by_key(|product| product.seq);
        Ok(products)
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        categories.sort_by_key(|category| category.seq);
        Ok(categories)
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.iter().map(|entry| entry.value().clone()).collect();
        posts.sort_by_key(|post| post.seq);
        Ok(posts)
    }

    async fn product_slugs_in_category(&self, category_slug: &str) -> anyhow::Result<Vec<String>> {
        let mut products: Vec<(u64, String)> = self
            .products
            .iter()
            .filter(|entry| {
                entry.deleted_at.is_none()
                    && entry.category_slug.as_deref() == Some(category_slug)
            })
            .map(|entry| (entry.seq, entry.slug.clone()))
            .collect();
        products.sort();
        Ok(products.into_iter().map(|(_, slug)| slug).collect())
    }
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}
