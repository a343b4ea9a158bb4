pub mod emergency;
pub mod pool;
pub mod receiver;
pub mod round;
pub mod share_vault;
pub mod twab;

pub use emergency::*;
pub use pool::*;
pub use receiver::*;
pub use round::*;
pub use share_vault::*;
pub use twab::*;
