pub mod clock;
pub mod object_key;
pub mod region;
