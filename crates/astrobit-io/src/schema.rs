//! The ordered feature list the model was fit on.

use crate::IoError;

/// Canonical features of the exoplanet transit model, in fit order.
pub const EXOPLANET_FEATURES: [&str; 7] = [
    "orbital_period",
    "transit_duration",
    "transit_depth_ppm",
    "planet_radius",
    "stellar_temp",
    "stellar_logg",
    "stellar_radius",
];

/// Ordered canonical feature names.
///
/// Column `j` of every matrix built from this schema holds feature `j`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from feature names in fit order.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`IoError::EmptySchema`] | `names` is empty |
    /// | [`IoError::DuplicateFeature`] | a name appears twice |
    pub fn new(names: Vec<String>) -> Result<Self, IoError> {
        if names.is_empty() {
            return Err(IoError::EmptySchema);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(IoError::DuplicateFeature { name: name.clone() });
            }
        }
        Ok(Self { names })
    }

    /// The seven-feature schema of the exoplanet transit model.
    #[must_use]
    pub fn exoplanet() -> Self {
        Self {
            names: EXOPLANET_FEATURES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the column position of a canonical feature.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`: a schema has at least one feature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::exoplanet()
    }
}
