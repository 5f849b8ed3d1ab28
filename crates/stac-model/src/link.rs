//! Link relation helpers.

use stac::Link;

/// Well-known link relation types.
pub mod rel {
    pub const SELF: &str = "self";
    pub const CHILD: &str = "child";
    pub const ITEM: &str = "item";
}

/// The link href as a string.
pub fn link_href(link: &Link) -> String {
    link.href.to_string()
}

/// The href of the first `self` link, if any.
pub fn self_href(links: &[Link]) -> Option<String> {
    links.iter().find(|l| l.rel == rel::SELF).map(link_href)
}

/// `child` and `item` links, in document order.
pub fn hierarchy_links(links: &[Link]) -> Vec<&Link> {
    links
        .iter()
        .filter(|l| l.rel == rel::CHILD || l.rel == rel::ITEM)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> Vec<Link> {
        serde_json::from_value(serde_json::json!([
            {"rel": "root", "href": "../catalog.json"},
            {"rel": "child", "href": "./a/catalog.json"},
            {"rel": "self", "href": "https://example.com/stac/catalog.json"},
            {"rel": "item", "href": "./b/b.json", "title": "B"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_self_href() {
        assert_eq!(
            self_href(&links()).as_deref(),
            Some("https://example.com/stac/catalog.json")
        );
        assert_eq!(self_href(&[]), None);
    }

    #[test]
    fn test_hierarchy_links_keep_order() {
        let links = links();
        let hrefs: Vec<_> = hierarchy_links(&links).into_iter().map(link_href).collect();
        assert_eq!(hrefs, vec!["./a/catalog.json", "./b/b.json"]);
    }
}
