//! Tree category catalog.
//!
//! # Responsibility
//! - Define the fixed, ordered list of tracked tree categories.
//!
//! # Invariants
//! - Declaration order is preserved; card layout and table columns follow it.
//! - `common_name` values are unique and non-blank.
//! - A catalog is immutable once built.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Conifer families tracked by default, in display order.
const CONIFERS: &[(&str, &str)] = &[
    ("araucaria", "Araucariaceae"),
    ("cypress", "Cupressaceae"),
    ("pine", "Pinaceae"),
    ("yellow-wood", "Podocarpaceae"),
    ("umbrella-pine", "Sciadopityaceae"),
    ("yew", "Taxaceae"),
];

/// One tracked tree category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeCategory {
    /// Unique key used by actions, snapshots and table columns.
    pub common_name: String,
    /// Botanical family, display only.
    pub family: String,
}

impl TreeCategory {
    pub fn new(common_name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            family: family.into(),
        }
    }

    /// Title-cased common name used for card headings and column labels.
    pub fn display_title(&self) -> String {
        title_case(&self.common_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Empty,
    BlankName { index: usize },
    DuplicateName(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "tree catalog must contain at least one category"),
            Self::BlankName { index } => {
                write!(f, "tree category at position {index} has a blank name")
            }
            Self::DuplicateName(name) => write!(f, "duplicate tree category `{name}`"),
        }
    }
}

impl Error for CatalogError {}

/// Ordered, immutable list of tree categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeCatalog {
    categories: Vec<TreeCategory>,
}

impl TreeCatalog {
    /// Builds a catalog, rejecting empty lists, blank names and duplicates.
    pub fn new(categories: Vec<TreeCategory>) -> Result<Self, CatalogError> {
        if categories.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, category) in categories.iter().enumerate() {
            if category.common_name.trim().is_empty() {
                return Err(CatalogError::BlankName { index });
            }
            if categories[..index]
                .iter()
                .any(|earlier| earlier.common_name == category.common_name)
            {
                return Err(CatalogError::DuplicateName(category.common_name.clone()));
            }
        }
        Ok(Self { categories })
    }

    /// The built-in conifer catalog.
    pub fn conifers() -> Self {
        Self {
            categories: CONIFERS
                .iter()
                .map(|(name, family)| TreeCategory::new(*name, *family))
                .collect(),
        }
    }

    /// Categories in declaration order.
    pub fn list(&self) -> &[TreeCategory] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Position of `common_name` in declaration order.
    pub fn position(&self, common_name: &str) -> Option<usize> {
        self.categories
            .iter()
            .position(|category| category.common_name == common_name)
    }

    pub fn get(&self, common_name: &str) -> Option<&TreeCategory> {
        self.position(common_name).map(|index| &self.categories[index])
    }
}

impl Default for TreeCatalog {
    fn default() -> Self {
        Self::conifers()
    }
}

/// Uppercases the first letter of every letter run and lowercases the rest.
pub(crate) fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{title_case, CatalogError, TreeCatalog, TreeCategory};

    #[test]
    fn conifers_keep_declaration_order() {
        let catalog = TreeCatalog::conifers();
        let names = catalog
            .list()
            .iter()
            .map(|category| category.common_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["araucaria", "cypress", "pine", "yellow-wood", "umbrella-pine", "yew"]
        );
        assert_eq!(catalog.position("yew"), Some(5));
        assert_eq!(catalog.get("pine").unwrap().family, "Pinaceae");
        assert!(catalog.get("oak").is_none());
    }

    #[test]
    fn new_rejects_invalid_lists() {
        assert_eq!(TreeCatalog::new(Vec::new()).unwrap_err(), CatalogError::Empty);
        assert_eq!(
            TreeCatalog::new(vec![TreeCategory::new("pine", "Pinaceae"), TreeCategory::new(" ", "x")])
                .unwrap_err(),
            CatalogError::BlankName { index: 1 }
        );
        assert_eq!(
            TreeCatalog::new(vec![
                TreeCategory::new("pine", "Pinaceae"),
                TreeCategory::new("pine", "Pinaceae"),
            ])
            .unwrap_err(),
            CatalogError::DuplicateName("pine".to_string())
        );
    }

    #[test]
    fn display_title_capitalizes_each_word() {
        assert_eq!(TreeCategory::new("yellow-wood", "Podocarpaceae").display_title(), "Yellow-Wood");
        assert_eq!(title_case("jANE doe"), "Jane Doe");
        assert_eq!(title_case("o'neil"), "O'Neil");
    }
}
