mod address;
mod hex;
mod thread_id;

pub use self::{
    address::{ImageRange, Va},
    hex::Hex,
    thread_id::ThreadId,
};
