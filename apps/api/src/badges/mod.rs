// Badge records: local store, upstream badge service, and the CRUD handlers.

pub mod external;
pub mod handlers;
pub mod store;
