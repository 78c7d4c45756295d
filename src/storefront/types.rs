use serde::{Deserialize, Serialize};

use crate::catalog::types::{Category, Post, Product};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub category_slug: Option<String>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug,
            name: product.name,
            description: product.description,
            price: product.price,
            category_slug: product.category_slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListPage {
    pub total: usize,
    pub items: Vec<ProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryView {
    pub slug: String,
    pub name: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug,
            name: category.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPage {
    pub category: CategoryView,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub published_at: Option<u64>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            published_at: post.published_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPage {
    pub total: usize,
    pub items: Vec<PostView>,
}
