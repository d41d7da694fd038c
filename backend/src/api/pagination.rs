//! Query-string pagination

use crate::error::AppError;
use crate::store::Page;

/// Page size when `limit` is absent
pub const DEFAULT_LIMIT: i64 = 100;
/// Largest accepted page size
pub const MAX_LIMIT: i64 = 1000;

/// Validate `skip`/`limit` against `1..=max` with `default` when absent
pub fn page_within(skip: Option<i64>, limit: Option<i64>, default: i64, max: i64) -> Result<Page, AppError> {
    let skip = skip.unwrap_or(0);
    if skip < 0 {
        return Err(AppError::Validation(format!(
            "skip must be >= 0 (got {})",
            skip
        )));
    }
    let limit = limit.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {} (got {})",
            max, limit
        )));
    }
    Ok(Page::new(skip as u64, limit as u64))
}

/// Listing page: `skip >= 0` (default 0), `limit` in 1..=1000 (default 100)
pub fn page(skip: Option<i64>, limit: Option<i64>) -> Result<Page, AppError> {
    page_within(skip, limit, DEFAULT_LIMIT, MAX_LIMIT)
}

/// Validate a bare result size against `1..=max`
pub fn limit_within(limit: u64, max: u64) -> Result<u64, AppError> {
    if (1..=max).contains(&limit) {
        Ok(limit)
    } else {
        Err(AppError::Validation(format!(
            "limit must be between 1 and {} (got {})",
            max, limit
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = page(None, None).unwrap();
        assert_eq!((p.skip, p.limit), (0, 100));
    }

    #[test]
    fn test_bounds() {
        assert!(page(Some(-1), None).is_err());
        assert!(page(None, Some(0)).is_err());
        assert!(page(None, Some(1001)).is_err());
        assert!(page(Some(5), Some(1000)).is_ok());
        assert!(page_within(None, Some(101), 10, 100).is_err());
        assert_eq!(limit_within(50, 100).unwrap(), 50);
        assert!(limit_within(0, 100).is_err());
    }
}
