//! Ship geography and the task catalog for the Airlock simulation.
//!
//! The spatial backbone of the game: the [`ShipMap`] holds the walk and vent
//! graphs over one room set, [`DistanceTable`] precomputes all-pairs walking
//! distances for crisis dispatch, [`Occupancy`] is the per-tick room index
//! rebuilt after movement resolves, and [`TaskCatalog`] carries the static
//! task tables and the per-player draw.

pub mod config;
pub mod error;
pub mod map;
pub mod tasks;

pub use config::ShipConfig;
pub use error::ShipError;
pub use map::{DistanceTable, Occupancy, ShipMap, shortest_path};
pub use tasks::{TaskCatalog, TaskSpec};
