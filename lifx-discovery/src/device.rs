//! Discovered devices and their classification.
//!
//! A device found by broadcast starts out provisional: only its hardware
//! address and where it answered from are known. The [`Classifier`] queries
//! its product id and turns it into a [`DiscoveredDevice`] with a fixed
//! [`DeviceRole`]. Roles are decided once, here, and never changed in place.

use std::net::SocketAddr;
use std::sync::Arc;

use lifx_exchange::{ExchangeEngine, ExchangeError, Target};
use lifx_protocol::{Features, HardwareAddress, MessageType, Payload, ProductCatalog};
use serde::{Deserialize, Serialize};

/// What kind of device this is, as far as the protocol cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceRole {
    /// Answers device messages only
    Generic,
    Light,
    /// Strip or beam with individually addressable zones
    MultiZoneLight,
    /// Chained tiles
    ChainLight,
}

impl DeviceRole {
    /// Role for a product with the given features. Unknown products are
    /// generic devices; multizone wins over chain.
    pub fn from_features(features: Option<Features>) -> Self {
        match features {
            None => DeviceRole::Generic,
            Some(f) if f.multizone => DeviceRole::MultiZoneLight,
            Some(f) if f.chain => DeviceRole::ChainLight,
            Some(_) => DeviceRole::Light,
        }
    }

    pub fn is_light(self) -> bool {
        !matches!(self, DeviceRole::Generic)
    }
}

/// What to do with a device whose product query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassificationFallback {
    /// Nearly everything on a LIFX network is a light
    #[default]
    AssumeLight,
    AssumeGeneric,
}

impl ClassificationFallback {
    fn role(self) -> DeviceRole {
        match self {
            ClassificationFallback::AssumeLight => DeviceRole::Light,
            ClassificationFallback::AssumeGeneric => DeviceRole::Generic,
        }
    }
}

/// Vendor, product and hardware version from `StateVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductVersion {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
}

/// A device seen during discovery, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionalDevice {
    pub mac: HardwareAddress,
    pub addr: SocketAddr,
    pub service: u8,
    pub port: u32,
}

/// A classified device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub mac: HardwareAddress,
    /// Address the device answered discovery from
    pub addr: SocketAddr,
    pub service: u8,
    pub port: u32,
    pub role: DeviceRole,
    /// `None` when the product query failed and the fallback role was used
    pub version: Option<ProductVersion>,
    pub product_name: Option<String>,
    pub features: Option<Features>,
}

impl DiscoveredDevice {
    pub fn is_light(&self) -> bool {
        self.role.is_light()
    }

    /// Whether the role came from the fallback policy rather than a version reply
    pub fn is_assumed(&self) -> bool {
        self.version.is_none()
    }

    pub fn target(&self) -> Target {
        Target::device(self.mac, Some(self.addr))
    }
}

/// Builds [`DiscoveredDevice`]s from provisional ones by probing
/// `GetVersion` and looking the product up in a catalog.
#[derive(Clone)]
pub struct Classifier {
    engine: Arc<ExchangeEngine>,
    catalog: Arc<dyn ProductCatalog>,
    fallback: ClassificationFallback,
}

impl Classifier {
    pub fn new(
        engine: Arc<ExchangeEngine>,
        catalog: Arc<dyn ProductCatalog>,
        fallback: ClassificationFallback,
    ) -> Self {
        Self {
            engine,
            catalog,
            fallback,
        }
    }

    /// Classify one device. Never fails: a device whose query fails gets
    /// the fallback role.
    pub fn classify(&self, provisional: ProvisionalDevice) -> DiscoveredDevice {
        match self.query_version(&provisional) {
            Ok(version) => {
                let features = self.catalog.features(version.product);
                DiscoveredDevice {
                    mac: provisional.mac,
                    addr: provisional.addr,
                    service: provisional.service,
                    port: provisional.port,
                    role: DeviceRole::from_features(features),
                    version: Some(version),
                    product_name: self.catalog.name(version.product).map(str::to_string),
                    features,
                }
            }
            Err(e) => {
                let role = self.fallback.role();
                tracing::warn!(
                    "Could not classify {} at {}, assuming {:?}: {}",
                    provisional.mac,
                    provisional.addr,
                    role,
                    e
                );
                DiscoveredDevice {
                    mac: provisional.mac,
                    addr: provisional.addr,
                    service: provisional.service,
                    port: provisional.port,
                    role,
                    version: None,
                    product_name: None,
                    features: None,
                }
            }
        }
    }

    fn query_version(&self, device: &ProvisionalDevice) -> Result<ProductVersion, ExchangeError> {
        let reply = self.engine.request_response(
            &Target::device(device.mac, Some(device.addr)),
            Payload::GetVersion,
            &[MessageType::StateVersion],
            self.engine.config().unicast(),
        )?;
        match reply.message.payload {
            Payload::StateVersion {
                vendor,
                product,
                version,
            } => Ok(ProductVersion {
                vendor,
                product,
                version,
            }),
            other => Err(ExchangeError::InvalidParameter(format!(
                "unexpected reply to GetVersion: {:?}",
                other.message_type()
            ))),
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifx_protocol::{BuiltinCatalog, ProductCatalog};
    use rstest::rstest;

    #[rstest]
    #[case(27, DeviceRole::Light)]
    #[case(31, DeviceRole::MultiZoneLight)]
    #[case(38, DeviceRole::MultiZoneLight)]
    #[case(55, DeviceRole::ChainLight)]
    #[case(10, DeviceRole::Light)]
    #[case(9999, DeviceRole::Generic)]
    fn test_role_from_catalog(#[case] product: u32, #[case] role: DeviceRole) {
        assert_eq!(DeviceRole::from_features(BuiltinCatalog.features(product)), role);
    }

    #[test]
    fn test_multizone_checked_before_chain() {
        let both = Features {
            multizone: true,
            chain: true,
            ..Features::default()
        };
        assert_eq!(DeviceRole::from_features(Some(both)), DeviceRole::MultiZoneLight);
    }

    #[test]
    fn test_only_generic_is_not_a_light() {
        assert!(!DeviceRole::Generic.is_light());
        assert!(DeviceRole::Light.is_light());
        assert!(DeviceRole::MultiZoneLight.is_light());
        assert!(DeviceRole::ChainLight.is_light());
    }

    #[test]
    fn test_default_fallback_assumes_light() {
        assert_eq!(ClassificationFallback::default().role(), DeviceRole::Light);
        assert_eq!(ClassificationFallback::AssumeGeneric.role(), DeviceRole::Generic);
    }
}
