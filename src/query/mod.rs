//! Query-string translation and paginated execution for list endpoints.
//!
//! `translate` turns `?field[op]=value&sort=-a,b&select=x,y&page=n&limit=m`
//! into a [`QueryDescriptor`]; `execute` runs one against a collection and
//! wraps the result in a [`Page`].

pub mod descriptor;
pub mod paginate;
pub mod translate;

pub use descriptor::{Param, Populate, QueryDescriptor};
pub use paginate::{execute, populate_relation, Page, PageRef, Pagination};
pub use translate::{translate, translate_query_string, QueryOptions};
