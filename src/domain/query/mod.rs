//! Declarative list queries: parameter binding, method templates, plans and
//! pagination.

pub mod documentation;
pub mod method;
pub mod params;
pub mod plan;
pub mod siconv;

pub use method::{JoinStep, MethodRegistry, QueryMethod, ResolvedPath, DEFAULT_WINDOW};
pub use params::{bind, Binding, Comparison, ParamSpec, ParamType, ParamValue, QueryError};
pub use plan::{Filter, QueryPlan, Window};
