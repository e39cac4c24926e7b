//! Product identifiers and their capabilities.
//!
//! `StateVersion` only reports a numeric product id. The catalog turns it
//! into a human readable name and the feature flags discovery uses to
//! classify a device.

use serde::{Deserialize, Serialize};

/// Capability flags of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Features {
    pub color: bool,
    pub temperature: bool,
    pub infrared: bool,
    pub multizone: bool,
    pub chain: bool,
}

/// Read-only lookup from product id to name and features.
pub trait ProductCatalog: Send + Sync {
    fn name(&self, product: u32) -> Option<&str>;

    fn features(&self, product: u32) -> Option<Features>;

    /// Every product the catalog knows about is a light
    fn is_light(&self, product: u32) -> bool {
        self.features(product).is_some()
    }
}

struct ProductEntry {
    id: u32,
    name: &'static str,
    features: Features,
}

const fn product(
    id: u32,
    name: &'static str,
    color: bool,
    infrared: bool,
    multizone: bool,
    chain: bool,
) -> ProductEntry {
    ProductEntry {
        id,
        name,
        features: Features {
            color,
            temperature: true,
            infrared,
            multizone,
            chain,
        },
    }
}

const PRODUCTS: &[ProductEntry] = &[
    product(1, "Original 1000", true, false, false, false),
    product(3, "Color 650", true, false, false, false),
    product(10, "White 800 (Low Voltage)", false, false, false, false),
    product(11, "White 800 (High Voltage)", false, false, false, false),
    product(18, "White 900 BR30 (Low Voltage)", false, false, false, false),
    product(20, "Color 1000 BR30", true, false, false, false),
    product(22, "Color 1000", true, false, false, false),
    product(27, "LIFX A19", true, false, false, false),
    product(28, "LIFX BR30", true, false, false, false),
    product(29, "LIFX+ A19", true, true, false, false),
    product(30, "LIFX+ BR30", true, true, false, false),
    product(31, "LIFX Z", true, false, true, false),
    product(32, "LIFX Z 2", true, false, true, false),
    product(36, "LIFX Downlight", true, false, false, false),
    product(37, "LIFX Downlight", true, false, false, false),
    product(38, "LIFX Beam", true, false, true, false),
    product(43, "LIFX A19", true, false, false, false),
    product(44, "LIFX BR30", true, false, false, false),
    product(45, "LIFX+ A19", true, true, false, false),
    product(46, "LIFX+ BR30", true, true, false, false),
    product(49, "LIFX Mini", true, false, false, false),
    product(50, "LIFX Mini Day and Dusk", false, false, false, false),
    product(51, "LIFX Mini White", false, false, false, false),
    product(52, "LIFX GU10", true, false, false, false),
    product(55, "LIFX Tile", true, false, false, true),
    product(57, "LIFX Candle", true, false, false, false),
    product(59, "LIFX Mini Color", true, false, false, false),
    product(60, "LIFX Mini Day and Dusk", false, false, false, false),
    product(61, "LIFX Mini White", false, false, false, false),
    product(62, "LIFX A19", true, false, false, false),
    product(63, "LIFX BR30", true, false, false, false),
    product(64, "LIFX A19 Night Vision", true, true, false, false),
    product(65, "LIFX BR30 Night Vision", true, true, false, false),
    product(66, "LIFX Mini White", false, false, false, false),
    product(68, "LIFX Candle", true, false, false, false),
    product(81, "LIFX Candle White to Warm", false, false, false, false),
    product(82, "LIFX Filament Clear", false, false, false, false),
];

/// Catalog compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl BuiltinCatalog {
    fn entry(product: u32) -> Option<&'static ProductEntry> {
        PRODUCTS.iter().find(|entry| entry.id == product)
    }
}

impl ProductCatalog for BuiltinCatalog {
    fn name(&self, product: u32) -> Option<&str> {
        Self::entry(product).map(|entry| entry.name)
    }

    fn features(&self, product: u32) -> Option<Features> {
        Self::entry(product).map(|entry| entry.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(27, "LIFX A19")]
    #[case(31, "LIFX Z")]
    #[case(55, "LIFX Tile")]
    fn test_known_product_names(#[case] id: u32, #[case] name: &str) {
        assert_eq!(BuiltinCatalog.name(id), Some(name));
        assert!(BuiltinCatalog.is_light(id));
    }

    #[test]
    fn test_unknown_product() {
        assert_eq!(BuiltinCatalog.name(9999), None);
        assert_eq!(BuiltinCatalog.features(9999), None);
        assert!(!BuiltinCatalog.is_light(9999));
    }

    #[test]
    fn test_feature_flags() {
        let strip = BuiltinCatalog.features(32).unwrap();
        assert!(strip.multizone && strip.color && !strip.chain);

        let tile = BuiltinCatalog.features(55).unwrap();
        assert!(tile.chain && !tile.multizone);

        let night_vision = BuiltinCatalog.features(64).unwrap();
        assert!(night_vision.infrared);

        let white = BuiltinCatalog.features(10).unwrap();
        assert!(!white.color && white.temperature);
    }

    #[test]
    fn test_product_ids_are_unique() {
        let mut ids: Vec<u32> = PRODUCTS.iter().map(|entry| entry.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PRODUCTS.len());
    }
}
