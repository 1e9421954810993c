pub mod error;
pub mod injection;
pub mod lifetime;
pub mod tag;
pub mod types;

pub use error::{StitchError, StitchResult};
pub use injection::Injection;
pub use lifetime::Lifetime;
pub use tag::Tag;
pub use types::{Substitution, TypeRef};
