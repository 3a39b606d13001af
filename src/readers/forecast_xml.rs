use crate::error::Result;
use crate::models::ForecastPeriod;
use crate::utils::time::local_date_of_rfc3339;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Reader for BOM précis forecast products (`IDV10753.xml` and friends).
pub struct ForecastXmlReader {
    city: String,
}

struct PendingValue {
    kind: String,
    units: Option<String>,
    text: String,
}

impl ForecastXmlReader {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
        }
    }

    /// Forecast periods of the first `area` whose description is the city.
    ///
    /// A product without that area yields no periods.
    pub fn read_periods(&self, xml: &str) -> Result<Vec<ForecastPeriod>> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut periods = Vec::new();
        let mut in_area = false;
        let mut current: Option<ForecastPeriod> = None;
        let mut pending: Option<PendingValue> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"area" => {
                        if attribute(&e, b"description")?.as_deref() == Some(self.city.as_str()) {
                            in_area = true;
                        }
                    }
                    b"forecast-period" if in_area => {
                        let index = attribute(&e, b"index")?.unwrap_or_default();
                        let date = attribute(&e, b"start-time-local")?
                            .and_then(|ts| local_date_of_rfc3339(&ts))
                            .map(|d| d.format("%Y-%m-%d").to_string());
                        current = Some(ForecastPeriod {
                            index,
                            date,
                            fields: BTreeMap::new(),
                        });
                    }
                    b"element" | b"text" if current.is_some() => {
                        if let Some(kind) = attribute(&e, b"type")? {
                            pending = Some(PendingValue {
                                kind,
                                units: attribute(&e, b"units")?,
                                text: String::new(),
                            });
                        }
                    }
                    _ => {}
                },
                Event::Empty(e) => {
                    // `<element type="..."/>` carries no value
                    if matches!(e.name().as_ref(), b"element" | b"text") {
                        let kind = attribute(&e, b"type")?;
                        if let (Some(kind), Some(period)) = (kind, current.as_mut()) {
                            period.fields.insert(kind, String::new());
                        }
                    }
                }
                Event::Text(t) => {
                    if let Some(value) = pending.as_mut() {
                        value.text.push_str(&t.unescape()?);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"element" | b"text" => {
                        if let (Some(value), Some(period)) = (pending.take(), current.as_mut()) {
                            let rendered = match value.units {
                                Some(units) => format!("{} {}", value.text, units),
                                None => value.text,
                            };
                            period.fields.insert(value.kind, rendered);
                        }
                    }
                    b"forecast-period" => {
                        if let Some(period) = current.take() {
                            periods.push(period);
                        }
                    }
                    b"area" if in_area => break,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if periods.is_empty() {
            warn!(city = %self.city, "No forecast area found for city");
        } else {
            debug!(city = %self.city, periods = periods.len(), "Parsed forecast periods");
        }
        Ok(periods)
    }
}

fn attribute(element: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
