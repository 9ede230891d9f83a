//! Raw kernel interface definitions.

#[allow(non_camel_case_types, non_snake_case)]
pub(crate) mod input;
