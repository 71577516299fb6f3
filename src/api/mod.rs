mod errors;
mod impls;
mod pool;
mod requests;
mod responses;
mod util;

pub use self::pool::*;
pub use errors::*;
pub use impls::*;
pub use requests::*;
pub use responses::*;
pub use util::*;
