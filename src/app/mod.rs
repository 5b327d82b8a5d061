pub mod renderer;
pub mod session;

pub use renderer::Renderer;
pub use session::{Session, SessionCommand, submit};
