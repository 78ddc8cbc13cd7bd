pub mod events;
pub mod prompt;
pub mod requests;
pub mod responses;
pub mod variable;

pub use events::*;
pub use prompt::*;
pub use requests::*;
pub use responses::*;
pub use variable::*;
