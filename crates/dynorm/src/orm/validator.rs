//! Record validation before writes.

use crate::core::Record;

/// Checks a record before it is inserted or updated.
///
/// Implementations push one message per problem; an empty list means the
/// record is valid. Closures of the same shape implement the trait.
pub trait Validator: Send + Sync {
    fn validate(&self, item: &Record, errors: &mut Vec<String>);
}

impl<F> Validator for F
where
    F: Fn(&Record, &mut Vec<String>) + Send + Sync,
{
    fn validate(&self, item: &Record, errors: &mut Vec<String>) {
        self(item, errors)
    }
}

/// Requires each named field to be present and non-NULL.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for RequiredFields {
    fn validate(&self, item: &Record, errors: &mut Vec<String>) {
        for field in &self.fields {
            if item.get(field).map_or(true, |v| v.is_null()) {
                errors.push(format!("{} is required", field));
            }
        }
    }
}
