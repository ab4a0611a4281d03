pub mod authz;
pub mod check;
pub mod domain;
pub mod invitation;
pub mod metaschema;
pub mod org;
pub mod pat;
pub mod platform;
pub mod service_user;
pub mod user;
