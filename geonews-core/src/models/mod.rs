pub mod article;
pub mod event;
pub mod query;

pub use article::{Article, NewArticle};
pub use event::{EventKind, InteractionEvent};
pub use query::{Location, QueryAnalysis, QueryIntent};
