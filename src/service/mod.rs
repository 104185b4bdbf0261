//! Endpoint services: validation, cursor codec, hooks, collection and item endpoints.

pub(crate) mod coerce;
mod collection;
mod cursor;
mod hooks;
mod item;
mod validation;

pub use collection::{parse_limit, CollectionEndpoint, ListPage};
pub use cursor::{CursorCodec, PaginationCursor};
pub use hooks::{
    AuthorizeHook, EndpointHooks, HookRegistry, IndexValueHook, PostSaveHook, PreSaveHook, RequestContext,
};
pub use item::ItemEndpoint;
pub use validation::{FieldRule, ValidationMode, ValidationModel};
