pub mod layout;
pub mod provider;
pub mod sampling;

pub use layout::{domain_name, DomainLayout, ITEMS_PER_DOMAIN};
pub use provider::{DataProvider, IoMats};
