/// Whether `domain` belongs to any of `rules`.
///
/// Rules are exact hosts, `*.suffix` wildcards (which also match the bare
/// suffix), or bare domains that implicitly cover their subdomains. A suffix
/// match always lands on a label boundary, so `example.com` never matches
/// `notexample.com`. The first matching rule wins; there is no precedence.
pub fn matches<S: AsRef<str>>(domain: &str, rules: &[S]) -> bool {
    if domain.is_empty() || rules.is_empty() {
        return false;
    }

    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return false;
    }

    rules.iter().any(|rule| {
        let rule = rule.as_ref().trim().to_lowercase();
        if rule.is_empty() {
            return false;
        }

        if rule == domain {
            return true;
        }

        if let Some(suffix) = rule.strip_prefix("*.") {
            return domain == suffix || is_subdomain_of(&domain, suffix);
        }

        is_subdomain_of(&domain, &rule)
    })
}

fn is_subdomain_of(domain: &str, parent: &str) -> bool {
    !parent.is_empty()
        && domain.len() > parent.len()
        && domain.ends_with(parent)
        && domain.as_bytes()[domain.len() - parent.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_rules() {
        assert!(matches("www.example.com", &["*.example.com"]));
        assert!(matches("example.com", &["*.example.com"]));
        assert!(!matches("badexample.com", &["*.example.com"]));
    }

    #[test]
    fn test_implicit_subdomain_rules() {
        assert!(matches("example.com", &["example.com"]));
        assert!(matches("a.b.example.com", &["example.com"]));
        assert!(!matches("notexample.com", &["example.com"]));
        assert!(!matches("example.com.evil.net", &["example.com"]));
    }

    #[test]
    fn test_rules_are_normalized() {
        assert!(matches("www.example.com", &["  EXAMPLE.com "]));
        assert!(matches("WWW.EXAMPLE.COM", &["example.com"]));
    }

    #[test]
    fn test_empty_inputs_never_match() {
        let no_rules: [&str; 0] = [];
        assert!(!matches("", &["example.com"]));
        assert!(!matches("example.com", &no_rules));
        assert!(!matches("example.com", &["", "   "]));
    }

    #[test]
    fn test_any_rule_matches() {
        let rules = vec!["other.org".to_string(), "*.example.com".to_string()];
        assert!(matches("cdn.example.com", &rules));
        assert!(!matches("example.net", &rules));
    }
}
