use roxmltree::Node;

/// What kind of document a sitemap turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitemapKind {
    /// sitemaps.org `<urlset>`
    Xml,
    /// sitemaps.org `<sitemapindex>`
    XmlIndex,
    /// RSS 2.0 `<rss>`
    Rss,
    /// Atom `<feed>`
    Atom,
    /// Anything else; handled by scanning the raw text for URLs
    Unknown,
}

/// Classifies a parsed document from its root element's tag and namespace
///
/// `urlset` and `sitemapindex` only count when they carry a sitemap namespace.
pub fn classify(root: Node<'_, '_>) -> SitemapKind {
    let tag = root.tag_name();
    let sitemap_namespace = tag.namespace().map(is_sitemap_namespace).unwrap_or(false);

    match (tag.name(), sitemap_namespace) {
        ("urlset", true) => SitemapKind::Xml,
        ("sitemapindex", true) => SitemapKind::XmlIndex,
        ("rss", _) => SitemapKind::Rss,
        ("feed", _) => SitemapKind::Atom,
        _ => SitemapKind::Unknown,
    }
}

fn is_sitemap_namespace(namespace: &str) -> bool {
    let namespace = namespace.to_ascii_lowercase();
    namespace.contains("sitemaps.org/schemas/sitemap")
        || namespace.contains("google.com/schemas/sitemap")
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn kind_of(xml: &str) -> SitemapKind {
        let doc = Document::parse(xml).unwrap();
        classify(doc.root_element())
    }

    #[test]
    fn test_urlset_and_index() {
        assert_eq!(
            kind_of(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#),
            SitemapKind::Xml
        );
        assert_eq!(
            kind_of(r#"<sitemapindex xmlns="https://www.sitemaps.org/schemas/sitemap/0.9"/>"#),
            SitemapKind::XmlIndex
        );
        assert_eq!(
            kind_of(r#"<urlset xmlns="http://www.google.com/schemas/sitemap/0.84"/>"#),
            SitemapKind::Xml
        );
    }

    #[test]
    fn test_urlset_without_namespace_is_unknown() {
        assert_eq!(kind_of("<urlset><url><loc>https://a.com/</loc></url></urlset>"), SitemapKind::Unknown);
    }

    #[test]
    fn test_feeds() {
        assert_eq!(kind_of(r#"<rss version="2.0"><channel/></rss>"#), SitemapKind::Rss);
        assert_eq!(kind_of(r#"<feed xmlns="http://www.w3.org/2005/Atom"/>"#), SitemapKind::Atom);
    }

    #[test]
    fn test_other_roots() {
        assert_eq!(kind_of("<html><body/></html>"), SitemapKind::Unknown);
    }
}
