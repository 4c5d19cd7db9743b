pub mod geo;
pub mod identity;
pub mod insights;
pub mod loader;
pub mod mapping;
pub mod navigation;
pub mod overlay;
pub mod region;

pub use geo::{BoundingRegion, GeoFeature, GeoFeatureSet};
pub use identity::{PropertyBag, RegencyNameIndex, RegionIdentity, resolve_identity};
pub use insights::*;
pub use loader::{GeoDatasetLoader, GeoSource, LoadError, LoadOutcome, LoadedDataset};
pub use mapping::{DatasetRef, RegionMapping};
pub use navigation::*;
pub use overlay::*;
pub use region::*;
