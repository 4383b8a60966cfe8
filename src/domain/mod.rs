//! Domain models for the ECommerce API surface

pub mod method;
pub mod password;
pub mod realm;
pub mod resource;
pub mod schema;
pub mod scope;

pub use method::*;
pub use password::*;
pub use realm::*;
pub use resource::*;
pub use schema::*;
pub use scope::*;
