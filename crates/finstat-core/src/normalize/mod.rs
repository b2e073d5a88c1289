pub mod canonical;
pub mod detect;
pub mod extractor;
pub mod fields;

pub use canonical::{canonicalize, canonicalize_subject, CanonicalStatementSet, PeriodRow};
pub use detect::{classify, ensure_not_empty, InputShape, RawFinancialInputShape};
pub use extractor::{extract_value, resolve_field, sanitize_value, FieldMatch, MatchKind};
pub use fields::{CanonicalField, Statement};
