use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Page must be 1 or greater")]
    InvalidPage,
    #[error("Limit must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidLimit,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
}

/// Offset pagination window over a newest-first listing.
///
/// Page `p` with limit `l` covers rows `(p-1)*l ..= p*l-1`. Rows inserted between
/// two page fetches shift later pages; there is no stable cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidLimit);
        }

        Ok(Pagination { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Rejects blank values, the server-side twin of an HTML `required` attribute.
pub fn require(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value)
    }
}

/// Shape check equivalent to `<input type="email">`: one `@`, non-empty local part,
/// a dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }

    Ok(email.to_lowercase())
}

pub fn validate_password(password: &str, min_len: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_len {
        return Err(ValidationError::WeakPassword(min_len));
    }
    Ok(())
}

/// Lowercases the name and collapses every whitespace run into a single `-`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Escapes `LIKE` wildcards so the term matches as a literal substring.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Normalizes a search term; blank input means "no filter".
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let pagination = Pagination::new(None, None).unwrap();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn test_pagination_offset() {
        let pagination = Pagination::new(Some(3), Some(10)).unwrap();
        assert_eq!(pagination.offset(), 20);
        assert_eq!(pagination.limit(), 10);
    }

    #[test]
    fn test_pagination_rejects_zero_page() {
        assert_eq!(
            Pagination::new(Some(0), None),
            Err(ValidationError::InvalidPage)
        );
    }

    #[test]
    fn test_pagination_rejects_bad_limit() {
        assert_eq!(
            Pagination::new(None, Some(0)),
            Err(ValidationError::InvalidLimit)
        );
        assert_eq!(
            Pagination::new(None, Some(MAX_PAGE_SIZE + 1)),
            Err(ValidationError::InvalidLimit)
        );
    }

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(
            require("title", "   ".to_string()),
            Err(ValidationError::Required("title"))
        );
        assert_eq!(require("title", "Hello".to_string()).unwrap(), "Hello");
    }

    #[test]
    fn test_validate_email_accepts_and_lowercases() {
        assert_eq!(
            validate_email(" Reader@Example.COM ").unwrap(),
            "reader@example.com"
        );
    }

    #[test]
    fn test_validate_email_rejects_malformed() {
        for bad in ["plain", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::InvalidEmail(_))),
                "expected {bad} to be rejected"
            );
        }
        assert_eq!(validate_email(""), Err(ValidationError::Required("email")));
    }

    #[test]
    fn test_slugify_collapses_whitespace() {
        assert_eq!(slugify("Rust  Tips"), "rust-tips");
        assert_eq!(slugify("  Web\tDev \n"), "web-dev");
        assert_eq!(slugify("single"), "single");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_search_term_blank_is_none() {
        assert_eq!(search_term(None), None);
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(Some(" rust ")), Some("rust".to_string()));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short", 8).is_err());
        assert!(validate_password("long enough", 8).is_ok());
    }
}
