pub mod bom;
pub mod open_meteo;

pub use bom::BomClient;
pub use open_meteo::OpenMeteoClient;
