use crate::error::{ProcessingError, Result};
use reqwest::Url;
use scraper::{Html, Selector};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ProcessingError::InvalidFormat(format!("Invalid selector '{}': {:?}", css, e)))
}

/// Absolute URL of the first anchor whose text contains `link_text`.
pub fn find_link(html: &str, base: &str, link_text: &str) -> Result<Url> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]")?;

    let href = document
        .select(&anchors)
        .find(|a| a.text().collect::<String>().contains(link_text))
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| ProcessingError::MissingData(format!("Link '{}' not found", link_text)))?;

    let base = Url::parse(base)
        .map_err(|e| ProcessingError::InvalidFormat(format!("Invalid URL '{}': {}", base, e)))?;
    base.join(href)
        .map_err(|e| ProcessingError::InvalidFormat(format!("Invalid link '{}': {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <ul class="downloads">
          <li><a href="/jsp/ncc/cdio/weatherData/av?p_display_type=dailyZippedDataFile&amp;p_stn_num=086338&amp;p_c=-1490888104&amp;p_nccObsCode=136&amp;p_startYear=2025">All years of data</a></li>
          <li><a href="/tmp/cdio/IDCJAC0009_086338_2025.zip">This year</a></li>
        </ul>
    </body></html>"#;

    #[test]
    fn test_find_link_resolves_relative_href() -> Result<()> {
        let url = find_link(PAGE, "https://www.bom.gov.au/jsp/ncc/cdio/weatherData/av", "All years of data")?;
        assert_eq!(url.host_str(), Some("www.bom.gov.au"));
        assert!(url.as_str().contains("p_display_type=dailyZippedDataFile"));
        assert!(url.as_str().contains("p_nccObsCode=136"));
        Ok(())
    }

    #[test]
    fn test_missing_link() {
        let err = find_link(PAGE, "https://www.bom.gov.au/", "Last decade").unwrap_err();
        assert!(matches!(err, ProcessingError::MissingData(_)));
    }
}
