//! Reference tables of known contaminant masses, grouped by category.
//!
//! A [`ReferenceTable`] is built once and then shared read-only by every
//! screening run that uses it. Category and entry order is preserved exactly as
//! given, which fixes the traversal order of the matcher.
use std::collections::HashSet;
use std::slice;

use crate::error::ScreenError;

/// A single known contaminant mass and a human readable label for it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceEntry {
    #[cfg_attr(feature = "serde", serde(alias = "mz"))]
    pub target_mz: f64,
    pub label: String,
}

impl ReferenceEntry {
    pub fn new(target_mz: f64, label: impl Into<String>) -> Self {
        Self {
            target_mz,
            label: label.into(),
        }
    }
}

impl<S: Into<String>> From<(f64, S)> for ReferenceEntry {
    fn from((target_mz, label): (f64, S)) -> Self {
        Self::new(target_mz, label)
    }
}

/// A named group of contaminants sharing a chemical origin
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContaminantCategory {
    pub name: String,
    pub entries: Vec<ReferenceEntry>,
}

impl ContaminantCategory {
    pub fn new(name: impl Into<String>, entries: Vec<ReferenceEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, ReferenceEntry> {
        self.entries.iter()
    }
}

/// An ordered mapping from contaminant category to its reference entries.
///
/// Construct one from literal pairs with [`ReferenceTable::from_pairs`], from one
/// of the [`BuiltinTable`] definitions, or by deserializing it when the `serde`
/// feature is enabled. The TOML shape is:
///
/// ```toml
/// [[category]]
/// name = "Polymers"
/// entries = [{ mz = 391.2843, label = "PEG/PPG" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceTable {
    #[cfg_attr(feature = "serde", serde(rename = "category", alias = "categories"))]
    categories: Vec<ContaminantCategory>,
}

impl ReferenceTable {
    pub fn new(categories: Vec<ContaminantCategory>) -> Self {
        Self { categories }
    }

    /// Build a table from `(category, [(target_mz, label), ...])` pairs.
    ///
    /// Repeated category names are folded into the first occurrence, keeping
    /// the entries in the order they were given.
    pub fn from_pairs<C, L, I, E>(pairs: I) -> Self
    where
        C: Into<String>,
        L: Into<String>,
        E: IntoIterator<Item = (f64, L)>,
        I: IntoIterator<Item = (C, E)>,
    {
        let mut categories: Vec<ContaminantCategory> = Vec::new();
        for (name, entries) in pairs {
            let name: String = name.into();
            let entries = entries.into_iter().map(ReferenceEntry::from);
            if let Some(cat) = categories.iter_mut().find(|c| c.name == name) {
                cat.entries.extend(entries);
            } else {
                categories.push(ContaminantCategory::new(name, entries.collect()));
            }
        }
        Self { categories }
    }

    /// Check that the table can be screened against.
    ///
    /// A table must have at least one category, every category must have at
    /// least one entry, names must be unique and every target m/z must be a
    /// finite positive number.
    pub fn validate(&self) -> Result<(), ScreenError> {
        if self.categories.is_empty() {
            return Err(ScreenError::EmptyReferenceTable);
        }
        let mut seen = HashSet::with_capacity(self.categories.len());
        for cat in self.categories.iter() {
            if !seen.insert(cat.name.as_str()) {
                return Err(ScreenError::DuplicateCategory(cat.name.clone()));
            }
            if cat.is_empty() {
                return Err(ScreenError::EmptyCategory(cat.name.clone()));
            }
            if let Some(bad) = cat
                .iter()
                .find(|e| !e.target_mz.is_finite() || e.target_mz <= 0.0)
            {
                return Err(ScreenError::InvalidTargetMass {
                    category: cat.name.clone(),
                    label: bad.label.clone(),
                    target_mz: bad.target_mz,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The total number of reference entries across all categories
    pub fn num_entries(&self) -> usize {
        self.categories.iter().map(|c| c.len()).sum()
    }

    pub fn iter(&self) -> slice::Iter<'_, ContaminantCategory> {
        self.categories.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ContaminantCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// The position of a category in table order
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }
}

impl<'a> IntoIterator for &'a ReferenceTable {
    type Item = &'a ContaminantCategory;
    type IntoIter = slice::Iter<'a, ContaminantCategory>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}

impl FromIterator<ContaminantCategory> for ReferenceTable {
    fn from_iter<T: IntoIterator<Item = ContaminantCategory>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// The reference tables that ship with the library. Variants convert to
/// [`ReferenceTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BuiltinTable {
    /// Four broad classes of common LC-MS contaminants, three masses each
    #[default]
    Standard,
    /// Fifteen finer grained categories, two masses each
    Extended,
}

impl From<BuiltinTable> for ReferenceTable {
    fn from(source: BuiltinTable) -> ReferenceTable {
        match source {
            BuiltinTable::Standard => ReferenceTable::from_pairs([
                (
                    "Polymers",
                    vec![
                        (391.2843, "PEG/PPG"),
                        (429.0887, "Polysiloxane"),
                        (445.1200, "Polyethylene glycol"),
                    ],
                ),
                (
                    "Detergents",
                    vec![
                        (311.2843, "Triton X"),
                        (522.3554, "Tween"),
                        (271.1747, "SDS derivative"),
                    ],
                ),
                (
                    "Plasticizers",
                    vec![
                        (391.2843, "Phthalate"),
                        (447.3091, "DEHP"),
                        (279.1596, "DBP"),
                    ],
                ),
                (
                    "Others",
                    vec![
                        (371.1012, "Unknown contaminant"),
                        (415.2662, "Solvent impurity"),
                        (503.3376, "Calibration standard"),
                    ],
                ),
            ]),
            BuiltinTable::Extended => ReferenceTable::from_pairs([
                ("Polymers", vec![(391.2843, "PEG/PPG"), (429.0887, "Polysiloxane")]),
                ("Detergents", vec![(311.2843, "Triton X"), (522.3554, "Tween")]),
                ("Plasticizers", vec![(447.3091, "DEHP"), (279.1596, "DBP")]),
                (
                    "Oxidation Products",
                    vec![(201.1234, "Oxidized lipid"), (217.1345, "Oxidized peptide")],
                ),
                (
                    "Adducts",
                    vec![(365.4567, "Sodium adduct"), (381.4678, "Potassium adduct")],
                ),
                (
                    "In-source Fragments",
                    vec![(157.0890, "Fragment A"), (173.0999, "Fragment B")],
                ),
                (
                    "Solvent Peaks",
                    vec![(89.0626, "Acetonitrile"), (59.0498, "Methanol")],
                ),
                (
                    "Calibration Standards",
                    vec![(519.1230, "Cal Standard 1"), (533.1340, "Cal Standard 2")],
                ),
                (
                    "Background Noise",
                    vec![(101.1010, "Background A"), (115.1111, "Background B")],
                ),
                (
                    "Salt Clusters",
                    vec![(203.2020, "NaCl cluster"), (219.2121, "KCl cluster")],
                ),
                (
                    "Lipids",
                    vec![
                        (760.5850, "Phosphatidylcholine"),
                        (786.6050, "Phosphatidylethanolamine"),
                    ],
                ),
                ("Peptides", vec![(500.3000, "Dipeptide"), (750.4500, "Tripeptide")]),
                (
                    "Carbohydrates",
                    vec![(365.1054, "Disaccharide"), (527.1789, "Trisaccharide")],
                ),
                ("Metabolites", vec![(180.0634, "Glucose"), (198.0735, "Fructose")]),
                (
                    "Environmental",
                    vec![(256.1233, "Pesticide A"), (284.1455, "Pesticide B")],
                ),
            ]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtin_tables() {
        let table: ReferenceTable = BuiltinTable::Standard.into();
        assert_eq!(table.len(), 4);
        assert_eq!(table.num_entries(), 12);
        let names: Vec<_> = table.category_names().collect();
        assert_eq!(names, ["Polymers", "Detergents", "Plasticizers", "Others"]);
        table.validate().unwrap();

        let table: ReferenceTable = BuiltinTable::Extended.into();
        assert_eq!(table.len(), 15);
        assert_eq!(table.num_entries(), 30);
        assert_eq!(table.position_of("Environmental"), Some(14));
        table.validate().unwrap();
    }

    #[test]
    fn test_from_pairs_folds_repeats() {
        let table = ReferenceTable::from_pairs([
            ("Polymers", vec![(391.2843, "PEG/PPG")]),
            ("Detergents", vec![(311.2843, "Triton X")]),
            ("Polymers", vec![(429.0887, "Polysiloxane")]),
        ]);
        assert_eq!(table.len(), 2);
        let polymers = table.get("Polymers").unwrap();
        assert_eq!(polymers.len(), 2);
        assert_eq!(polymers.entries[1].label, "Polysiloxane");
    }

    #[test]
    fn test_validate() {
        let table = ReferenceTable::default();
        assert_eq!(table.validate(), Err(ScreenError::EmptyReferenceTable));

        let table = ReferenceTable::new(vec![ContaminantCategory::new("Empty", vec![])]);
        assert_eq!(
            table.validate(),
            Err(ScreenError::EmptyCategory("Empty".to_string()))
        );

        let table = ReferenceTable::new(vec![
            ContaminantCategory::new("A", vec![ReferenceEntry::new(100.0, "x")]),
            ContaminantCategory::new("A", vec![ReferenceEntry::new(200.0, "y")]),
        ]);
        assert_eq!(
            table.validate(),
            Err(ScreenError::DuplicateCategory("A".to_string()))
        );

        let table = ReferenceTable::from_pairs([("A", vec![(f64::NAN, "bad")])]);
        let err = table.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize() {
        let text = r#"{"category": [{"name": "Polymers", "entries": [{"mz": 391.2843, "label": "PEG/PPG"}]}]}"#;
        let table: ReferenceTable = serde_json::from_str(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Polymers").unwrap().entries[0].target_mz, 391.2843);
    }
}
