/// Analysis layer: local descriptive statistics plus the typed results of
/// the external analysis service.
///
/// Only `summary` computes anything here. Model metrics, predictions and
/// feature importances come from the service through `client`; nothing in
/// this crate fabricates them.

pub mod client;
pub mod report;
pub mod summary;
