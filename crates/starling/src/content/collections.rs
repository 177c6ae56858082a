use derive_more::{Deref, DerefMut};
use indexmap::IndexMap;

use crate::content::{Article, ArticleIndex, Category, CategoryId, PageId};

#[derive(Debug, Default, Deref, DerefMut)]
pub struct Categories(IndexMap<CategoryId, Category>);

#[derive(Debug, Default, Deref, DerefMut)]
pub struct Articles(IndexMap<PageId, Article>);

#[derive(Debug, Default, Deref, DerefMut)]
pub struct ArticleIndexes(IndexMap<PageId, ArticleIndex>);
