//! Core runtime for Formshape: the dot-path value model, the
//! flatten/unflatten engines, the value resolver, and the collaborator
//! seams exported via the `prelude`.

// public exports are one module level down
pub mod flatten;
pub mod path;
pub mod pathmap;
pub mod resolve;
pub mod sniff;
pub mod trace;
pub mod tree;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No resolvers, sniffers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        flatten::{Flattener, RelatedItem, Relation, RelationSelect},
        path::PathSegment,
        pathmap::PathMap,
        value::{Value, ValueMap},
    };
}
