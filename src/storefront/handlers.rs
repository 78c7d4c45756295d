use super::page_cache::{PageCache, RenderedPage};
use super::types::*;
use crate::catalog::store::CatalogStore;
use crate::config::Config;
use crate::error::AppError;
use crate::invalidation::policy::{
    BLOG_PATH, PRODUCTS_PATH, SITEMAP_PATH, category_path, post_path, product_path,
};

use axum::extract::Path;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::fmt::Write;
use std::sync::Arc;
use urlencoding::encode;

fn respond(page: &RenderedPage) -> Response {
    ([(CONTENT_TYPE, page.content_type)], page.body.clone()).into_response()
}

/// `GET /products`
pub async fn handle_products(
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let page = pages
        .get_or_render(PRODUCTS_PATH, || async move { render_products(&store) })
        .await?;
    Ok(respond(&page))
}

/// `GET /products/:slug`
pub async fn handle_product(
    Path(slug): Path<String>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let path = product_path(&slug);
    let page = pages
        .get_or_render(&path, || async move { render_product(&store, &slug) })
        .await?;
    Ok(respond(&page))
}

/// `GET /categories/:slug`
pub async fn handle_category(
    Path(slug): Path<String>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let path = category_path(&slug);
    let page = pages
        .get_or_render(&path, || async move { render_category(&store, &slug) })
        .await?;
    Ok(respond(&page))
}

/// `GET /blog`
pub async fn handle_blog(
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let page = pages
        .get_or_render(BLOG_PATH, || async move { render_blog(&store) })
        .await?;
    Ok(respond(&page))
}

/// `GET /blog/:slug`
pub async fn handle_post(
    Path(slug): Path<String>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let path = post_path(&slug);
    let page = pages
        .get_or_render(&path, || async move { render_post(&store, &slug) })
        .await?;
    Ok(respond(&page))
}

/// `GET /sitemap.xml`
pub async fn handle_sitemap(
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(pages): Extension<Arc<PageCache>>,
) -> Result<Response, AppError> {
    let page = pages
        .get_or_render(SITEMAP_PATH, || async move {
            render_sitemap(&store, &config.site_url)
        })
        .await?;
    Ok(respond(&page))
}

// ============================================================
// RENDERING
// ============================================================

fn render_products(store: &CatalogStore) -> Result<RenderedPage, AppError> {
    let now = store.now();
    let items: Vec<ProductView> = store
        .visible_products(now)
        .into_iter()
        .map(ProductView::from)
        .collect();

    let page = RenderedPage::json(&ProductListPage {
        total: items.len(),
        items,
    })?;
    Ok(page.expiring_at(store.next_publication(now)))
}

fn render_product(store: &CatalogStore, slug: &str) -> Result<RenderedPage, AppError> {
    let product = store
        .product_by_slug(slug)
        .filter(|product| product.is_visible(store.now()))
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    RenderedPage::json(&ProductView::from(product))
}

fn render_category(store: &CatalogStore, slug: &str) -> Result<RenderedPage, AppError> {
    let category = store
        .category_by_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;
    let now = store.now();
    let products = store
        .visible_products_in_category(slug, now)
        .into_iter()
        .map(ProductView::from)
        .collect();

    let page = RenderedPage::json(&CategoryPage {
        category: category.into(),
        products,
    })?;
    Ok(page.expiring_at(store.next_publication(now)))
}

fn render_blog(store: &CatalogStore) -> Result<RenderedPage, AppError> {
    let now = store.now();
    let items: Vec<PostView> = store
        .visible_posts(now)
        .into_iter()
        .map(PostView::from)
        .collect();

    let page = RenderedPage::json(&BlogPage {
        total: items.len(),
        items,
    })?;
    Ok(page.expiring_at(store.next_publication(now)))
}

fn render_post(store: &CatalogStore, slug: &str) -> Result<RenderedPage, AppError> {
    let post = store
        .visible_posts(store.now())
        .into_iter()
        .find(|post| post.slug == slug)
        .ok_or_else(|| AppError::NotFound(format!("post {slug}")))?;

    RenderedPage::json(&PostView::from(post))
}

fn render_sitemap(store: &CatalogStore, site_url: &str) -> Result<RenderedPage, AppError> {
    let now = store.now();
    let mut paths = vec![PRODUCTS_PATH.to_string(), BLOG_PATH.to_string()];
    paths.extend(
        store
            .visible_products(now)
            .iter()
            .map(|product| product_path(&encode(&product.slug))),
    );
    paths.extend(
        store
            .live_categories()
            .iter()
            .map(|category| category_path(&encode(&category.slug))),
    );
    paths.extend(
        store
            .visible_posts(now)
            .iter()
            .map(|post| post_path(&encode(&post.slug))),
    );

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in paths {
        // Slugs may hold any lowercase letter; percent-encoding leaves no XML specials.
        writeln!(xml, "  <url><loc>{site_url}{path}</loc></url>")
            .map_err(|e| AppError::Internal(format!("rendering sitemap: {e}")))?;
    }
    xml.push_str("</urlset>\n");

    Ok(RenderedPage::xml(xml).expiring_at(store.next_publication(now)))
}
