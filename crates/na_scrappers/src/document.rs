use na_core::{Error, Result, ScrapedPage};
use scraper::{Html, Selector};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const NO_CONTENT: &str = "No content found";
pub const ERROR_TITLE: &str = "Error";
pub const ERROR_CONTENT: &str = "Failed to scrape content";

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Extracts the title and paragraph text of a rendered page.
///
/// Never fails: a page that cannot be read still yields a well-formed result
/// carrying the error fallback title and content.
pub fn scrape_document(html: &str, url: &str) -> ScrapedPage {
    match try_scrape(html, url) {
        Ok(page) => {
            tracing::debug!(url, title = %page.title, content_len = page.content.len(), "scraped page");
            page
        }
        Err(e) => {
            tracing::warn!(url, "content scraping failed: {}", e);
            ScrapedPage {
                title: ERROR_TITLE.to_string(),
                content: ERROR_CONTENT.to_string(),
                url: url.to_string(),
            }
        }
    }
}

fn try_scrape(html: &str, url: &str) -> Result<ScrapedPage> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "h1")?
        .or(first_text(&document, "title")?)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let content = utils::extract_texts(&document, "p")?
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR);

    Ok(ScrapedPage {
        title,
        content: if content.is_empty() { NO_CONTENT.to_string() } else { content },
        url: url.to_string(),
    })
}

/// Text of the first element matching `selector`, whitespace collapsed; `None` when missing or blank.
fn first_text(document: &Html, selector: &str) -> Result<Option<String>> {
    Ok(utils::extract_text(document, selector)?
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty()))
}

/// Splits scraped content back into its paragraphs.
pub fn split_into_paragraphs(content: &str) -> Vec<String> {
    content
        .split(PARAGRAPH_SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) mod utils {
    use super::*;

    pub fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| Error::Scraping(format!("Invalid selector {}: {}", selector, e)))
    }

    pub fn extract_text(document: &Html, selector: &str) -> Result<Option<String>> {
        let selector = parse_selector(selector)?;
        Ok(document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>()))
    }

    pub fn extract_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
        let selector = parse_selector(selector)?;
        Ok(document
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://news.example.com/story";

    #[test]
    fn test_heading_and_paragraphs() {
        let html = r#"
            <html><head><title>Site | Story</title></head>
            <body>
                <h1>  Markets rally
                  after rate cut </h1>
                <p>First paragraph.</p>
                <p>   </p>
                <p> Second <b>bold</b> paragraph. </p>
            </body></html>
        "#;
        let page = scrape_document(html, URL);
        assert_eq!(page.title, "Markets rally after rate cut");
        assert_eq!(page.content, "First paragraph.\n\nSecond bold paragraph.");
        assert_eq!(page.url, URL);
    }

    #[test]
    fn test_falls_back_to_document_title() {
        let html = "<html><head><title>Only a title</title></head><body><div>no paragraphs</div></body></html>";
        let page = scrape_document(html, URL);
        assert_eq!(page.title, "Only a title");
        assert_eq!(page.content, NO_CONTENT);
    }

    #[test]
    fn test_empty_heading_falls_through() {
        let html = "<html><head><title>Doc title</title></head><body><h1> </h1><p>x</p></body></html>";
        assert_eq!(scrape_document(html, URL).title, "Doc title");
    }

    #[test]
    fn test_unknown_title_and_no_content() {
        let page = scrape_document("<html><body><span>bare</span></body></html>", URL);
        assert_eq!(page.title, UNKNOWN_TITLE);
        assert_eq!(page.content, NO_CONTENT);
    }

    #[test]
    fn test_garbage_input_still_well_formed() {
        let page = scrape_document("<<<>>> \u{0} </p></h1>", URL);
        assert!(!page.title.is_empty());
        assert!(!page.content.is_empty());
        assert_eq!(page.url, URL);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let document = Html::parse_document("<p>x</p>");
        assert!(utils::extract_texts(&document, "p[").is_err());
    }

    #[test]
    fn test_split_into_paragraphs() {
        let content = "Section 1\n\nSection 2\n\n\nSection 3";
        let sections = split_into_paragraphs(content);
        assert_eq!(sections, vec!["Section 1", "Section 2", "Section 3"]);
    }
}
