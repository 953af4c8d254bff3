// Domain-layer modules and shared errors/models
pub mod errors {
    pub use crate::errors::*;
}

pub mod filler {
    pub use crate::filler::*;
}

pub mod mapping {
    pub use crate::mapping::*;
}

pub mod registry {
    pub use crate::registry::*;
}
