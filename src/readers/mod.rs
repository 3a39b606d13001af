pub mod axf_reader;
pub mod climate_reader;
pub mod forecast_page;
pub mod forecast_xml;
pub mod history_reader;
pub mod html;

pub use axf_reader::AxfDocument;
pub use climate_reader::ClimateTable;
pub use forecast_page::read_forecast_page;
pub use forecast_xml::ForecastXmlReader;
pub use history_reader::HistoryReader;
pub use html::find_link;
