//! Injection site extraction.
//!
//! Turns an implementation type into the ordered list of values it needs:
//! the parameters of the selected constructor, then member injections in
//! `(ordinal, declaration order)`.

pub mod extractor;
pub mod site;

pub use extractor::{ExtractError, SiteExtractor};
pub use site::{InjectionPlan, InjectionSite, MemberInjection, SiteKind};
