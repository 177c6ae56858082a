use std::cmp::Ordering;

use crate::content::Article;

/// Sorts articles by publish time in descending order (newest to oldest), breaking
/// ties by descending identifier.
///
/// Articles that have never been published sort after every published article.
pub fn sort_articles_by_publish_date(articles: Vec<Article>) -> Vec<Article> {
    let (mut sortable, mut not_sortable): (Vec<Article>, Vec<Article>) = articles
        .into_iter()
        .partition(|article| article.first_published_at.is_some());

    sortable.sort_unstable_by(|a, b| match b.first_published_at.cmp(&a.first_published_at) {
        Ordering::Equal => b.id.cmp(&a.id),
        ord => ord,
    });
    not_sortable.sort_unstable_by(|a, b| b.id.cmp(&a.id));

    let mut reordered = sortable;
    reordered.extend(not_sortable);
    reordered
}
