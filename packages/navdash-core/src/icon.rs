use regex::Regex;
/// Site icon helpers.
///
/// An icon URL is produced from the `site.iconApi` template by substituting
/// the `{domain}` placeholder with the host of the site's URL.
use std::sync::LazyLock;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://)?(?:[^@/\n]+@)?(?:www\.)?([^:/\n?#]+)").unwrap()
});

/// Host part of a URL. The scheme is optional; userinfo and a leading
/// `www.` are dropped.
pub fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    DOMAIN_RE
        .captures(url)
        .map(|caps| caps[1].to_lowercase())
        .filter(|domain| !domain.is_empty())
}

/// Fill the `{domain}` placeholder of an icon API template.
pub fn icon_url(template: &str, url: &str) -> Option<String> {
    extract_domain(url).map(|domain| template.replace("{domain}", &domain))
}
