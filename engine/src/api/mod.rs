pub mod health;
pub mod risk;
pub mod router;
pub mod state;
pub mod tasks;


pub use router::{router, serve, worker_router};
pub use state::ApiState;
