mod definition;
mod polygon;
mod region;
mod store;

pub use definition::{Canvas, Vertex, ZoneDefinition, ZoneDocument};
pub use polygon::Polygon;
pub use region::Zone;
pub use store::{ZoneCheck, ZoneStore};
