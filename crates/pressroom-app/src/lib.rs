// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod error;
pub mod fetch;
pub mod ids;
pub mod media;
pub mod model;
pub mod mutation;
pub mod notify;
pub mod patch;
pub mod profile;
pub mod query;
pub mod resource;
pub mod selection;
pub mod stats;
pub mod store;
pub mod view;

pub use error::*;
pub use fetch::*;
pub use ids::*;
pub use media::*;
pub use model::*;
pub use mutation::*;
pub use notify::*;
pub use patch::*;
pub use profile::*;
pub use query::*;
pub use resource::*;
pub use selection::*;
pub use stats::*;
pub use store::*;
pub use view::*;
