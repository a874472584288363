//! Attribute-set declarations, resolution, and projection for Formshape
//! entity types.

pub mod entity;
pub mod project;
pub mod set;

use crate::entity::RegistryError;
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        entity::{EntityKind, EntityType, EntityTypeRegistry, SetSpec},
        set::{AttributeDescriptor, AttributeSetRegistry, DescriptorMap, ResolvedSet},
    };
    pub use formshape_core::value::{Value, ValueMap};
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    RegistryError(#[from] RegistryError),
}
