//! Closed identifiers for frameworks and languages.
//!
//! Both enumerations are fixed at compile time. The language of a container is
//! never detected on its own: it is always derived from the framework via
//! [`FrameworkId::language`].

#[macro_use]
pub mod id_enum_macro;

pub mod framework_id;
pub mod language_id;

pub use framework_id::FrameworkId;
pub use language_id::LanguageId;
