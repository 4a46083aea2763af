use serde::Deserialize;

/// SQL query builder for the product listing endpoint
/// Builds a single parameterized query with filters, sorting and pagination
pub struct SQLQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl SQLQueryBuilder {
    /// Creates a new SQLQueryBuilder with default values
    pub fn new() -> Self {
        Self {
            base_query: "SELECT id, name, category, description, price, image_url, stock, \
                         specifications, created_at, updated_at FROM products"
                .to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: None,
            limit: 10,
            offset: 0,
        }
    }

    /// Adds a search filter for partial name matching (case-insensitive)
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("name ILIKE ${}", param_index));
        self.params.push(format!("%{}%", search));
    }

    /// Adds a category filter (case-insensitive exact match)
    pub fn add_category_filter(&mut self, category: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("category ILIKE ${}", param_index));
        self.params.push(category.to_string());
    }

    /// Adds price range filters; bounds are inclusive. Parameters travel
    /// as text, so the comparison casts them back to numeric.
    pub fn add_price_range(&mut self, min: Option<f64>, max: Option<f64>) {
        if let Some(min_price) = min {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price >= ${}::numeric", param_index));
            self.params.push(min_price.to_string());
        }

        if let Some(max_price) = max {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price <= ${}::numeric", param_index));
            self.params.push(max_price.to_string());
        }
    }

    /// Sets the sort order for the query
    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Price => "price",
            SortField::Name => "name",
            SortField::CreatedAt => "created_at",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        self.order_clause = Some(format!("{} {}", field_name, order_str));
    }

    /// Sets pagination from a 1-indexed page number and page size
    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Builds the final SQL query string with all parameters
    /// Returns a tuple of (query_string, parameters)
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = self.base_query.clone();

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        } else {
            query.push_str(" ORDER BY id");
        }

        // LIMIT and OFFSET are validated integers, inlined directly
        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

impl Default for SQLQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters extracted from the HTTP request
/// All fields are optional to support flexible querying
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Search term for partial name matching (case-insensitive)
    pub search: Option<String>,
    /// Filter by category (case-insensitive exact match)
    pub category: Option<String>,
    /// Minimum price filter (inclusive)
    pub min_price: Option<f64>,
    /// Maximum price filter (inclusive)
    pub max_price: Option<f64>,
    /// Sort field: "price", "name" or "created_at"
    pub sort: Option<String>,
    /// Sort order: "asc" or "desc"
    pub order: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 10, capped at 100)
    pub limit: Option<u32>,
}

/// Sort field options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Name,
    CreatedAt,
}

/// Sort order options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized query parameters
#[derive(Debug)]
pub struct ValidatedQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// Validation error type for query parameters
#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Validates and normalizes query parameters
    pub fn validate(params: QueryParams) -> Result<ValidatedQuery, ValidationError> {
        let search = Self::normalize_string(params.search);
        let category = Self::normalize_string(params.category);

        let min_price = match params.min_price {
            Some(price) => {
                Self::validate_price(price, "min_price")?;
                Some(price)
            }
            None => None,
        };

        let max_price = match params.max_price {
            Some(price) => {
                Self::validate_price(price, "max_price")?;
                Some(price)
            }
            None => None,
        };

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(ValidationError {
                    message: "min_price cannot be greater than max_price".to_string(),
                });
            }
        }

        let sort_field = match params.sort {
            Some(ref sort_str) => Some(Self::parse_sort_field(sort_str)?),
            None => None,
        };

        let sort_order = match params.order {
            Some(ref order_str) => Self::parse_sort_order(order_str)?,
            None => SortOrder::Asc,
        };

        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError {
                message: "page must be at least 1".to_string(),
            });
        }

        let limit = params.limit.unwrap_or(10);
        if limit == 0 || limit > 100 {
            return Err(ValidationError {
                message: "limit must be between 1 and 100".to_string(),
            });
        }

        Ok(ValidatedQuery {
            search,
            category,
            min_price,
            max_price,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Trims a string parameter; empty becomes None
    fn normalize_string(value: Option<String>) -> Option<String> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn validate_price(price: f64, field: &str) -> Result<(), ValidationError> {
        if price.is_finite() && price >= 0.0 {
            Ok(())
        } else {
            Err(ValidationError {
                message: format!("{} must be a non-negative number", field),
            })
        }
    }

    fn parse_sort_field(value: &str) -> Result<SortField, ValidationError> {
        match value.to_lowercase().as_str() {
            "price" => Ok(SortField::Price),
            "name" => Ok(SortField::Name),
            "created_at" => Ok(SortField::CreatedAt),
            _ => Err(ValidationError {
                message: format!("Invalid sort field: {}", value),
            }),
        }
    }

    fn parse_sort_order(value: &str) -> Result<SortOrder, ValidationError> {
        match value.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError {
                message: format!("Invalid sort order: {}", value),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_params() -> QueryParams {
        QueryParams {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_defaults() {
        let validated = QueryValidator::validate(empty_params()).unwrap();
        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 10);
        assert_eq!(validated.sort_order, SortOrder::Asc);
        assert!(validated.sort_field.is_none());
    }

    #[test]
    fn test_price_range_validation() {
        let mut params = empty_params();
        params.min_price = Some(500.0);
        params.max_price = Some(100.0);
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_invalid_sort_field() {
        let mut params = empty_params();
        params.sort = Some("popularity".to_string());
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_builder_composes_filters() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_search_filter("mug");
        builder.add_category_filter("kitchen");
        builder.add_price_range(Some(100.0), Some(1000.0));
        builder.set_sort(SortField::Price, SortOrder::Desc);
        builder.set_pagination(2, 20);

        let (query, params) = builder.build();
        assert!(query.contains("name ILIKE $1"));
        assert!(query.contains("category ILIKE $2"));
        assert!(query.contains("price >= $3::numeric"));
        assert!(query.contains("price <= $4::numeric"));
        assert!(query.contains("ORDER BY price DESC"));
        assert!(query.contains("LIMIT 20"));
        assert!(query.contains("OFFSET 20"));
        assert_eq!(params, vec!["%mug%", "kitchen", "100", "1000"]);
    }

    #[test]
    fn test_builder_without_filters() {
        let (query, params) = SQLQueryBuilder::new().build();
        assert!(!query.contains("WHERE"));
        assert!(query.contains("ORDER BY id"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_normalized_strings() {
        let mut params = empty_params();
        params.search = Some("   ".to_string());
        params.category = Some(" kitchen ".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert!(validated.search.is_none());
        assert_eq!(validated.category.as_deref(), Some("kitchen"));
    }
}
