//! Formshape — dot-path record shaping and attribute-set projection.
//!
//! This is the public meta-crate. Downstream users depend on **formshape**
//! only.
//!
//! It re-exports the stable public API from:
//!   - `formshape-core`   (value model, flatten/unflatten, resolver)
//!   - `formshape-schema` (entity types, attribute sets, projection)

pub use formshape_core as core;
pub use formshape_schema as schema;

//
// Prelude
//

pub mod prelude {
    pub use formshape_core::prelude::*;
    pub use formshape_schema::prelude::*;
}
