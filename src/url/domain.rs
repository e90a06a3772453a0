use url::{Host, Url};

/// Derives the domain token that the whitelist is matched against
///
/// The token is the label immediately left of the public suffix, using the Public
/// Suffix List (ICANN and private sections), so subdomains and multi-label suffixes
/// collapse to the same token. IP hosts use their textual form.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ladang_crawler::url::domain_token;
///
/// let url = Url::parse("https://www.farmanddairy.com/news").unwrap();
/// assert_eq!(domain_token(&url), Some("farmanddairy".to_string()));
///
/// let url = Url::parse("https://news.bbc.co.uk/").unwrap();
/// assert_eq!(domain_token(&url), Some("bbc".to_string()));
/// ```
pub fn domain_token(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            // A host that is itself a suffix (e.g. "localhost") has no registrable part
            let registrable = registrable_domain(&domain).unwrap_or(domain.as_str());
            registrable
                .split('.')
                .next()
                .filter(|label| !label.is_empty())
                .map(str::to_string)
        }
    }
}

/// The public suffix plus one label, e.g. "example.com.ng" for "shop.example.com.ng"
pub fn registrable_domain(host: &str) -> Option<&str> {
    psl::domain_str(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(url: &str) -> Option<String> {
        domain_token(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_bare_domain() {
        assert_eq!(token("https://farmanddairy.com/"), Some("farmanddairy".into()));
    }

    #[test]
    fn test_www_subdomain() {
        assert_eq!(
            token("https://www.farmanddairy.com/page"),
            Some("farmanddairy".into())
        );
    }

    #[test]
    fn test_nested_subdomain() {
        assert_eq!(token("https://a.b.example.org/x"), Some("example".into()));
    }

    #[test]
    fn test_multi_label_suffix() {
        assert_eq!(token("https://www.bbc.co.uk/news"), Some("bbc".into()));
        assert_eq!(token("https://kompas.co.id/"), Some("kompas".into()));
    }

    #[test]
    fn test_suffixes_beyond_common_ones() {
        assert_eq!(
            token("https://shop.example.com.ng/item"),
            Some("example".into())
        );
        assert_eq!(token("https://noticias.example.com.br/"), Some("example".into()));
    }

    #[test]
    fn test_private_suffix() {
        assert_eq!(token("https://user.github.io/repo"), Some("user".into()));
        assert_eq!(
            token("https://app.myproject.blogspot.com/"),
            Some("myproject".into())
        );
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(
            registrable_domain("shop.example.com.ng"),
            Some("example.com.ng")
        );
        assert_eq!(registrable_domain("com.ng"), None);
    }

    #[test]
    fn test_unknown_tld_uses_last_label_as_suffix() {
        assert_eq!(token("http://example.test/a"), Some("example".into()));
    }

    #[test]
    fn test_uppercase_host() {
        assert_eq!(token("https://WWW.Example.COM/"), Some("example".into()));
    }

    #[test]
    fn test_single_label_host() {
        assert_eq!(token("http://localhost:8080/"), Some("localhost".into()));
    }

    #[test]
    fn test_ip_host() {
        assert_eq!(token("http://127.0.0.1:9000/a"), Some("127.0.0.1".into()));
    }

    #[test]
    fn test_no_host() {
        assert_eq!(token("mailto:someone@example.com"), None);
    }
}
