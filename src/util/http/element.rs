use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

/// Extracts the text of the first element under `element` matching `css_selector`.
///
/// Returns `None` when the selector is invalid or nothing matches.
pub fn parse_value(element: &ElementRef, css_selector: &str) -> Option<String> {
    match Selector::parse(css_selector) {
        Ok(s) => element
            .select(&s)
            .next()
            .map(|v| v.text().collect::<String>()),
        Err(_) => None,
    }
}

/// What to look for in a fetched page.
#[derive(Debug, Clone)]
pub struct GetOneElementText<'a> {
    /// Where the document came from, only used in error messages.
    pub url: &'a str,
    /// Selector of the container element.
    pub selector: &'a str,
    /// Selector of the element inside the container whose text is wanted.
    /// An empty string takes the container's own text.
    pub element: &'a str,
    pub document: &'a Html,
}

/// Finds the first container matching `target.selector` and returns the
/// trimmed text of `target.element` inside it.
///
/// # Errors
///
/// Fails when either selector does not parse or no element matches.
pub fn get_one_element(target: GetOneElementText<'_>) -> Result<String> {
    let selector = Selector::parse(target.selector)
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;
    let container = target
        .document
        .select(&selector)
        .next()
        .ok_or_else(|| anyhow!("'{}' not found in {}", target.selector, target.url))?;

    let text = if target.element.is_empty() {
        Some(container.text().collect::<String>())
    } else {
        parse_value(&container, target.element)
    };

    text.map(|t| t.trim().to_string()).ok_or_else(|| {
        anyhow!(
            "'{} {}' not found in {}",
            target.selector,
            target.element,
            target.url
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="quote-header">
            <div class="row">
              <span class="price"> 128,431.20 </span>
              <span class="change">(+0.45%)</span>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn test_get_one_element() {
        let document = Html::parse_document(PAGE);
        let price = get_one_element(GetOneElementText {
            url: "https://example.com",
            selector: "#quote-header > div.row",
            element: "span.price",
            document: &document,
        })
        .unwrap();

        assert_eq!(price, "128,431.20");
    }

    #[test]
    fn test_get_one_element_own_text() {
        let document = Html::parse_document(PAGE);
        let change = get_one_element(GetOneElementText {
            url: "https://example.com",
            selector: "span.change",
            element: "",
            document: &document,
        })
        .unwrap();

        assert_eq!(change, "(+0.45%)");
    }

    #[test]
    fn test_get_one_element_missing() {
        let document = Html::parse_document(PAGE);
        let result = get_one_element(GetOneElementText {
            url: "https://example.com",
            selector: "#quote-header",
            element: "span.volume",
            document: &document,
        });

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("span.volume"));
    }
}
