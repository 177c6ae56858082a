use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content::Locale;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The key shared by every locale variant of the same logical category.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationKey(pub String);

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved, localized category.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub locale: Locale,
    pub translation_key: TranslationKey,
}

impl Category {
    /// Returns an unsaved copy of this category for the given locale.
    ///
    /// The copy carries no slug of its own, so saving it picks up the slug of
    /// the existing variants in its translation group.
    pub fn translate_to(&self, locale: Locale) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            slug: None,
            description: self.description.clone(),
            locale,
            translation_key: Some(self.translation_key.clone()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A category that has not been saved yet.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub locale: Locale,
    #[serde(default)]
    pub translation_key: Option<TranslationKey>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, locale: Locale) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: String::new(),
            locale,
            translation_key: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the explicitly supplied slug, if it is not blank.
    pub fn explicit_slug(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
    }

    /// Returns the slug derived from the category's name.
    pub fn slugified_name(&self) -> String {
        slug::slugify(&self.name)
    }
}
