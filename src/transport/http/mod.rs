pub mod policy;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod consulta;
    pub mod dados;
    pub mod health;
    pub mod metodos;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
