//! Error types for network operations

use crate::components::Cell;
use hecs::Entity;
use thiserror::Error;

/// Caller-side misuse of the network.
///
/// These indicate a bug in the calling code, not a runtime condition;
/// an empty target set is reported through outcomes, never as an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("cell {0} is outside the map")]
    OutOfBounds(Cell),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
