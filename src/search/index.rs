//! Index builder.
//!
//! Materialises a flat entry list from the visible catalog. Each build starts from
//! scratch; there is no incremental patching.

use super::tokenizer::normalize;
use super::types::{EntryKind, IndexEntry, SearchIndex};
use crate::catalog::source::CatalogSource;

use anyhow::{Context, Result};
use std::collections::HashMap;

pub async fn build_index(source: &dyn CatalogSource, now: u64) -> Result<SearchIndex> {
    let products = source
        .list_products()
        .await
        .context("listing products")?;
    let categories = source
        .list_categories()
        .await
        .context("listing categories")?;
    let posts = source.list_posts().await.context("listing posts")?;

    let category_names: HashMap<String, String> = categories
        .into_iter()
        .filter(|category| category.deleted_at.is_none())
        .map(|category| (category.slug, category.name))
        .collect();

    let expires_at = products
        .iter()
        .filter_map(|product| product.scheduled_after(now))
        .chain(posts.iter().filter_map(|post| post.scheduled_after(now)))
        .min();

    let mut entries = Vec::with_capacity(products.len() + posts.len());

    for product in products.into_iter().filter(|p| p.is_visible(now)) {
        let category_name = product
            .category_slug
            .as_ref()
            .and_then(|slug| category_names.get(slug))
            .map(String::as_str)
            .unwrap_or_default();

        entries.push(IndexEntry {
            searchable: searchable_blob(&[
                product.name.as_str(),
                product.description.as_str(),
                category_name,
            ]),
            id: product.id,
            kind: EntryKind::Product,
            slug: product.slug,
            name: product.name,
            description: product.description,
        });
    }

    for post in posts.into_iter().filter(|p| p.is_visible(now)) {
        entries.push(IndexEntry {
            searchable: searchable_blob(&[post.title.as_str(), post.excerpt.as_str()]),
            id: post.id,
            kind: EntryKind::Post,
            slug: post.slug,
            name: post.title,
            description: post.excerpt,
        });
    }

    tracing::debug!("Built search index with {} entries", entries.len());

    Ok(SearchIndex {
        entries,
        built_at: now,
        expires_at,
    })
}

fn searchable_blob(parts: &[&str]) -> String {
    normalize(&parts.join(" "))
}
